//! DDL and transformation SQL for the music streaming star schema.
//!
//! Two staging tables mirror the raw JSON feeds; `songplays` is the fact
//! table and `users`, `songs`, `artists` and `time` are its dimensions.

pub const CREATE_STAGING_EVENTS: &str = r#"CREATE TABLE IF NOT EXISTS staging_events (
    artist VARCHAR(256),
    auth VARCHAR(50),
    first_name VARCHAR(50),
    gender CHAR(1),
    item_in_session INT,
    last_name VARCHAR(50),
    length FLOAT,
    level VARCHAR(50),
    location VARCHAR(256),
    method VARCHAR(10),
    page VARCHAR(50),
    registration BIGINT,
    session_id INT,
    song VARCHAR(256),
    status INT,
    ts BIGINT,
    user_agent TEXT,
    user_id INT
)"#;

pub const CREATE_STAGING_SONGS: &str = r#"CREATE TABLE IF NOT EXISTS staging_songs (
    num_songs INT,
    artist_id VARCHAR(50),
    artist_name VARCHAR(256),
    artist_latitude FLOAT,
    artist_longitude FLOAT,
    artist_location VARCHAR(256),
    song_id VARCHAR(50),
    title VARCHAR(256),
    duration FLOAT,
    year INT
)"#;

pub const CREATE_SONGPLAYS: &str = r#"CREATE TABLE IF NOT EXISTS songplays (
    play_id VARCHAR(32) PRIMARY KEY,
    start_time TIMESTAMP NOT NULL,
    user_id INT NOT NULL,
    level VARCHAR(50),
    song_id VARCHAR(50),
    artist_id VARCHAR(50),
    session_id INT,
    location VARCHAR(256),
    user_agent TEXT
)"#;

pub const CREATE_USERS: &str = r#"CREATE TABLE IF NOT EXISTS users (
    user_id INT PRIMARY KEY,
    first_name VARCHAR(50),
    last_name VARCHAR(50),
    gender CHAR(1),
    level VARCHAR(50)
)"#;

pub const CREATE_SONGS: &str = r#"CREATE TABLE IF NOT EXISTS songs (
    song_id VARCHAR(50) PRIMARY KEY,
    title VARCHAR(256),
    artist_id VARCHAR(50),
    year INT,
    duration FLOAT
)"#;

pub const CREATE_ARTISTS: &str = r#"CREATE TABLE IF NOT EXISTS artists (
    artist_id VARCHAR(50) PRIMARY KEY,
    name VARCHAR(256),
    location VARCHAR(256),
    latitude FLOAT,
    longitude FLOAT
)"#;

pub const CREATE_TIME: &str = r#"CREATE TABLE IF NOT EXISTS time (
    start_time TIMESTAMP PRIMARY KEY,
    hour INT,
    day INT,
    week INT,
    month INT,
    year INT,
    day_of_week INT
)"#;

/// Every table of the star schema, staging included, in creation order.
pub const CREATE_TABLE_STATEMENTS: [&str; 7] = [
    CREATE_STAGING_EVENTS,
    CREATE_STAGING_SONGS,
    CREATE_SONGPLAYS,
    CREATE_USERS,
    CREATE_SONGS,
    CREATE_ARTISTS,
    CREATE_TIME,
];

pub const SONGPLAY_COLUMNS: &str =
    "play_id, start_time, user_id, level, song_id, artist_id, session_id, location, user_agent";

/// A play is identified by the session and the playback timestamp. Rows
/// without a user or timestamp cannot satisfy the fact table constraints
/// and are dropped here. Plays with no song catalog match keep NULL
/// song_id/artist_id.
pub const SONGPLAY_INSERT_SELECT: &str = r#"SELECT DISTINCT
    md5(events.session_id::TEXT || events.start_time::TEXT) AS play_id,
    events.start_time,
    events.user_id,
    events.level,
    songs.song_id,
    songs.artist_id,
    events.session_id,
    events.location,
    events.user_agent
FROM (
    SELECT TIMESTAMP 'epoch' + ts / 1000 * INTERVAL '1 second' AS start_time, *
    FROM staging_events
    WHERE page = 'NextSong'
) events
LEFT JOIN staging_songs songs
    ON events.song = songs.title
    AND events.artist = songs.artist_name
    AND events.length = songs.duration
WHERE events.user_id IS NOT NULL
    AND events.start_time IS NOT NULL"#;

pub const USER_INSERT_SELECT: &str = r#"SELECT DISTINCT user_id, first_name, last_name, gender, level
FROM staging_events
WHERE page = 'NextSong'
    AND user_id IS NOT NULL"#;

pub const SONG_INSERT_SELECT: &str = r#"SELECT DISTINCT song_id, title, artist_id, year, duration
FROM staging_songs"#;

pub const ARTIST_INSERT_SELECT: &str = r#"SELECT DISTINCT artist_id, artist_name, artist_location, artist_latitude, artist_longitude
FROM staging_songs"#;

pub const TIME_INSERT_SELECT: &str = r#"SELECT DISTINCT start_time,
    EXTRACT(hour FROM start_time),
    EXTRACT(day FROM start_time),
    EXTRACT(week FROM start_time),
    EXTRACT(month FROM start_time),
    EXTRACT(year FROM start_time),
    EXTRACT(dow FROM start_time)
FROM songplays"#;

pub const SONGPLAYS_COUNT_CHECK: &str = "SELECT COUNT(*) FROM songplays";
