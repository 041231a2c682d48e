//! Store schema / 数据库表结构
//!
//! The import pipeline owns the data; serving only needs the tables to exist.
//! Every statement is idempotent so a fresh database and an imported one look the same.

use sqlx::SqlitePool;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS langCode (
        id INTEGER PRIMARY KEY,
        codeName TEXT NOT NULL,
        displayName TEXT NOT NULL,
        imported INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS textMap (
        hash INTEGER NOT NULL,
        lang INTEGER NOT NULL,
        content TEXT NOT NULL,
        PRIMARY KEY (hash, lang)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dialogue (
        dialogueId INTEGER NOT NULL,
        talkerId INTEGER,
        talkerType TEXT,
        talkId INTEGER NOT NULL,
        textHash INTEGER NOT NULL,
        coopQuestId INTEGER,
        PRIMARY KEY (dialogueId, talkId)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS npc (
        npcId INTEGER PRIMARY KEY,
        textHash INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS avatar (
        avatarId INTEGER PRIMARY KEY,
        nameTextMapHash INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fetters (
        fetterId INTEGER PRIMARY KEY,
        avatarId INTEGER NOT NULL,
        voiceTitleTextMapHash INTEGER,
        voiceFileTextTextMapHash INTEGER,
        voiceFile INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS voice (
        dialogueId INTEGER NOT NULL,
        voicePath TEXT NOT NULL,
        gameTrigger TEXT,
        avatarId INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (dialogueId, voicePath)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quest (
        questId INTEGER PRIMARY KEY,
        titleTextMapHash INTEGER,
        chapterId INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS questTalk (
        questId INTEGER NOT NULL,
        talkId INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chapter (
        chapterId INTEGER PRIMARY KEY,
        chapterTitleTextMapHash INTEGER,
        chapterNumTextMapHash INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS manualTextMap (
        textMapId TEXT PRIMARY KEY,
        textHash INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS readable (
        fileName TEXT NOT NULL,
        lang TEXT NOT NULL,
        content TEXT NOT NULL,
        titleTextMapHash INTEGER,
        readableId INTEGER,
        PRIMARY KEY (fileName, lang)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subtitle (
        fileName TEXT NOT NULL,
        lang INTEGER NOT NULL,
        startTime REAL NOT NULL,
        endTime REAL NOT NULL,
        content TEXT NOT NULL,
        subtitleId INTEGER
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS textMap_hash_index ON textMap(hash)",
    "CREATE INDEX IF NOT EXISTS textMap_lang_index ON textMap(lang)",
    "CREATE INDEX IF NOT EXISTS dialogue_textHash_index ON dialogue(textHash)",
    "CREATE INDEX IF NOT EXISTS dialogue_talkId_index ON dialogue(talkId)",
    "CREATE INDEX IF NOT EXISTS dialogue_talkerType_index ON dialogue(talkerType)",
    "CREATE INDEX IF NOT EXISTS voice_dialogueId_index ON voice(dialogueId)",
    "CREATE INDEX IF NOT EXISTS fetters_text_index ON fetters(voiceFileTextTextMapHash)",
    "CREATE INDEX IF NOT EXISTS questTalk_questId_index ON questTalk(questId)",
    "CREATE INDEX IF NOT EXISTS questTalk_talkId_index ON questTalk(talkId)",
    "CREATE INDEX IF NOT EXISTS readable_lang_index ON readable(lang)",
    "CREATE INDEX IF NOT EXISTS readable_readableId_index ON readable(readableId)",
    "CREATE INDEX IF NOT EXISTS subtitle_file_index ON subtitle(fileName, lang)",
    "CREATE INDEX IF NOT EXISTS subtitle_id_index ON subtitle(subtitleId)",
];

/// Create tables and indexes if missing / 创建缺失的表和索引
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
