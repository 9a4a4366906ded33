//! SQLite-backed knowledge source.
//!
//! Loads the reference tables into a [`KnowledgeSnapshot`] and persists
//! calibration outputs back. The engine never reads SQLite directly.

use super::schema::init_knowledge_tables;
use super::seed::{
    KnowledgeSeed, MultiplierRow, PrerequisiteRow, TheoremQuestionRow, TheoremScoreRow,
    TheoremTriangleRow,
};
use super::KnowledgeSnapshot;
use crate::calibration::{DynamicMultiplierRecord, HelpfulnessRecord, TheoremScoreRecord};
use crate::error::Result;
use crate::storage::{open_pool, with_conn, DEFAULT_POOL_SIZE};
use crate::types::{
    AnswerId, AnswerOption, Question, QuestionId, Theorem, TheoremId, TriangleCategory, TriangleId,
};
use deadpool_sqlite::Pool;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use tracing::{debug, info};

/// Knowledge tables stored in a SQLite database
pub struct SqliteKnowledgeSource {
    pool: Pool,
}

impl SqliteKnowledgeSource {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::with_pool_size(db_path, DEFAULT_POOL_SIZE)
    }

    pub fn with_pool_size<P: AsRef<Path>>(db_path: P, pool_size: usize) -> Result<Self> {
        Ok(Self {
            pool: open_pool(db_path, pool_size)?,
        })
    }

    pub async fn init_schema(&self) -> Result<()> {
        with_conn(&self.pool, "initialize knowledge schema", |conn| {
            init_knowledge_tables(conn)
        })
        .await
    }

    /// Read every knowledge table and validate it into a snapshot
    pub async fn load_snapshot(&self) -> Result<KnowledgeSnapshot> {
        let seed = with_conn(&self.pool, "load knowledge tables", |conn| read_seed(conn)).await?;
        info!(
            "Loaded knowledge: {} questions, {} theorems, {} initial / {} dynamic multipliers",
            seed.questions.len(),
            seed.theorems.len(),
            seed.initial_multipliers.len(),
            seed.dynamic_multipliers.len()
        );
        seed.into_snapshot()
    }

    /// Replace every knowledge table with the contents of `snapshot`
    pub async fn import_snapshot(&self, snapshot: &KnowledgeSnapshot) -> Result<()> {
        let seed = KnowledgeSeed::from(snapshot);
        with_conn(&self.pool, "import knowledge", move |conn| {
            let tx = conn.transaction()?;
            write_seed(&tx, &seed)?;
            tx.commit()
        })
        .await?;
        info!("Imported knowledge snapshot");
        Ok(())
    }

    /// Replace the Dynamic multiplier tier
    pub async fn store_dynamic_multipliers(&self, records: Vec<DynamicMultiplierRecord>) -> Result<()> {
        let count = records.len();
        let now = chrono::Utc::now().timestamp();
        with_conn(&self.pool, "store dynamic multipliers", move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM dynamic_multipliers", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO dynamic_multipliers
                     (question_id, answer_id, triangle_id, multiplier,
                      session_count_total, session_count_with_triangle, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for record in &records {
                    let (q, a, t) = record.key;
                    stmt.execute(params![
                        q.0,
                        a.0,
                        t.0,
                        record.multiplier,
                        record.sessions as i64,
                        record.sessions_with_triangle as i64,
                        now
                    ])?;
                }
            }
            tx.commit()
        })
        .await?;
        debug!("Stored {} dynamic multipliers", count);
        Ok(())
    }

    /// Replace the theorem-score table
    pub async fn store_theorem_scores(&self, records: Vec<TheoremScoreRecord>) -> Result<()> {
        let count = records.len();
        with_conn(&self.pool, "store theorem scores", move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM theorem_scores", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO theorem_scores
                     (question_id, answer_id, theorem_id, count_total, count_helpful, score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for record in &records {
                    let (q, a, th) = record.key;
                    stmt.execute(params![
                        q.0,
                        a.0,
                        th.0,
                        record.total as i64,
                        record.helpful as i64,
                        record.score
                    ])?;
                }
            }
            tx.commit()
        })
        .await?;
        debug!("Stored {} theorem scores", count);
        Ok(())
    }

    /// Upsert general helpfulness per theorem
    pub async fn store_general_helpfulness(&self, records: Vec<HelpfulnessRecord>) -> Result<()> {
        let count = records.len();
        with_conn(&self.pool, "store general helpfulness", move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO theorem_helpfulness (theorem_id, helpful_session_count, general_helpfulness)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(theorem_id) DO UPDATE SET
                         helpful_session_count = excluded.helpful_session_count,
                         general_helpfulness = excluded.general_helpfulness",
                )?;
                for record in &records {
                    stmt.execute(params![
                        record.theorem.0,
                        record.helpful_sessions as i64,
                        record.value
                    ])?;
                }
            }
            tx.commit()
        })
        .await?;
        debug!("Stored general helpfulness for {} theorems", count);
        Ok(())
    }
}

fn read_seed(conn: &Connection) -> rusqlite::Result<KnowledgeSeed> {
    let triangles = conn
        .prepare("SELECT triangle_id, label FROM triangles ORDER BY triangle_id")?
        .query_map([], |row| {
            Ok(TriangleCategory {
                id: TriangleId(row.get(0)?),
                label: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let answers = conn
        .prepare("SELECT answer_id, label FROM answer_options ORDER BY answer_id")?
        .query_map([], |row| {
            Ok(AnswerOption {
                id: AnswerId(row.get(0)?),
                label: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let questions = conn
        .prepare(
            "SELECT question_id, question_text, difficulty_level, active, related_theorem
             FROM questions ORDER BY question_id",
        )?
        .query_map([], |row| {
            Ok(Question {
                id: QuestionId(row.get(0)?),
                text: row.get(1)?,
                difficulty: row.get(2)?,
                active: row.get(3)?,
                related_theorem: row.get::<_, Option<u32>>(4)?.map(TheoremId),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let theorems = conn
        .prepare(
            "SELECT t.theorem_id, t.theorem_text, t.category, t.active,
                    COALESCE(h.general_helpfulness, 0.0)
             FROM theorems t
             LEFT JOIN theorem_helpfulness h ON h.theorem_id = t.theorem_id
             ORDER BY t.theorem_id",
        )?
        .query_map([], |row| {
            Ok(Theorem {
                id: TheoremId(row.get(0)?),
                text: row.get(1)?,
                category: row.get::<_, Option<u32>>(2)?.map(TriangleId),
                active: row.get(3)?,
                general_helpfulness: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let prerequisites = conn
        .prepare(
            "SELECT dependent_question_id, prerequisite_question_id FROM question_prerequisites",
        )?
        .query_map([], |row| {
            Ok(PrerequisiteRow {
                question: QuestionId(row.get(0)?),
                requires: QuestionId(row.get(1)?),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let theorem_triangles = conn
        .prepare("SELECT theorem_id, triangle_id, connection_strength FROM theorem_triangles")?
        .query_map([], |row| {
            Ok(TheoremTriangleRow {
                theorem: TheoremId(row.get(0)?),
                triangle: TriangleId(row.get(1)?),
                weight: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let theorem_questions = conn
        .prepare("SELECT theorem_id, question_id FROM theorem_questions")?
        .query_map([], |row| {
            Ok(TheoremQuestionRow {
                theorem: TheoremId(row.get(0)?),
                question: QuestionId(row.get(1)?),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let initial_multipliers = read_multipliers(conn, "initial_multipliers")?;
    let dynamic_multipliers = read_multipliers(conn, "dynamic_multipliers")?;

    let theorem_scores = conn
        .prepare("SELECT question_id, answer_id, theorem_id, score FROM theorem_scores")?
        .query_map([], |row| {
            Ok(TheoremScoreRow {
                question: QuestionId(row.get(0)?),
                answer: AnswerId(row.get(1)?),
                theorem: TheoremId(row.get(2)?),
                score: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(KnowledgeSeed {
        triangles,
        answers,
        questions,
        theorems,
        prerequisites,
        theorem_triangles,
        theorem_questions,
        initial_multipliers,
        dynamic_multipliers,
        theorem_scores,
    })
}

fn read_multipliers(conn: &Connection, table: &str) -> rusqlite::Result<Vec<MultiplierRow>> {
    let sql = format!(
        "SELECT question_id, answer_id, triangle_id, multiplier FROM {}",
        table
    );
    let rows = conn
        .prepare(&sql)?
        .query_map([], |row| {
            Ok(MultiplierRow {
                question: QuestionId(row.get(0)?),
                answer: AnswerId(row.get(1)?),
                triangle: TriangleId(row.get(2)?),
                multiplier: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn write_seed(tx: &Transaction<'_>, seed: &KnowledgeSeed) -> rusqlite::Result<()> {
    for table in [
        "triangles",
        "answer_options",
        "theorems",
        "questions",
        "question_prerequisites",
        "theorem_triangles",
        "theorem_questions",
        "initial_multipliers",
        "dynamic_multipliers",
        "theorem_scores",
        "theorem_helpfulness",
    ] {
        tx.execute(&format!("DELETE FROM {}", table), [])?;
    }

    for triangle in &seed.triangles {
        tx.execute(
            "INSERT INTO triangles (triangle_id, label) VALUES (?1, ?2)",
            params![triangle.id.0, triangle.label],
        )?;
    }
    for answer in &seed.answers {
        tx.execute(
            "INSERT INTO answer_options (answer_id, label) VALUES (?1, ?2)",
            params![answer.id.0, answer.label],
        )?;
    }
    for theorem in &seed.theorems {
        tx.execute(
            "INSERT INTO theorems (theorem_id, theorem_text, category, active) VALUES (?1, ?2, ?3, ?4)",
            params![
                theorem.id.0,
                theorem.text,
                theorem.category.map(|c| c.0),
                theorem.active
            ],
        )?;
        tx.execute(
            "INSERT INTO theorem_helpfulness (theorem_id, general_helpfulness) VALUES (?1, ?2)",
            params![theorem.id.0, theorem.general_helpfulness],
        )?;
    }
    for question in &seed.questions {
        tx.execute(
            "INSERT INTO questions (question_id, question_text, difficulty_level, active, related_theorem)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                question.id.0,
                question.text,
                question.difficulty,
                question.active,
                question.related_theorem.map(|t| t.0)
            ],
        )?;
    }
    for row in &seed.prerequisites {
        tx.execute(
            "INSERT INTO question_prerequisites (dependent_question_id, prerequisite_question_id)
             VALUES (?1, ?2)",
            params![row.question.0, row.requires.0],
        )?;
    }
    for row in &seed.theorem_triangles {
        tx.execute(
            "INSERT INTO theorem_triangles (theorem_id, triangle_id, connection_strength)
             VALUES (?1, ?2, ?3)",
            params![row.theorem.0, row.triangle.0, row.weight],
        )?;
    }
    for row in &seed.theorem_questions {
        tx.execute(
            "INSERT INTO theorem_questions (theorem_id, question_id) VALUES (?1, ?2)",
            params![row.theorem.0, row.question.0],
        )?;
    }
    for (table, rows) in [
        ("initial_multipliers", &seed.initial_multipliers),
        ("dynamic_multipliers", &seed.dynamic_multipliers),
    ] {
        let sql = format!(
            "INSERT INTO {} (question_id, answer_id, triangle_id, multiplier) VALUES (?1, ?2, ?3, ?4)",
            table
        );
        for row in rows {
            tx.execute(
                &sql,
                params![row.question.0, row.answer.0, row.triangle.0, row.multiplier],
            )?;
        }
    }
    for row in &seed.theorem_scores {
        tx.execute(
            "INSERT INTO theorem_scores (question_id, answer_id, theorem_id, score) VALUES (?1, ?2, ?3, ?4)",
            params![row.question.0, row.answer.0, row.theorem.0, row.score],
        )?;
    }
    Ok(())
}
