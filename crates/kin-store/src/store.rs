use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};

use kin_core::{EmotionEngine, EmotionRecord, EmotionalState, MoodVector};

use crate::error::{Result, StoreError};
use crate::schema;

const SELECT_STATE: &str = "SELECT valence, arousal, connection, curiosity, energy,
        baseline_valence, baseline_arousal, baseline_connection, baseline_curiosity, baseline_energy,
        recent_emotions, last_updated
     FROM emotional_states WHERE user_id = ?1";

/// Keyed record store for per-user `EmotionalState`.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::InvalidData(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // --- Lifecycle ---

    /// Create the seed state for `user_id` unless one already exists.
    /// Returns the stored state and whether it was created by this call.
    pub fn create_state(&self, user_id: &str, now: i64) -> Result<(EmotionalState, bool)> {
        let tx = self.immediate()?;
        if let Some(existing) = load_on(&tx, user_id)? {
            tx.commit()?;
            return Ok((existing, false));
        }
        let seed = EmotionalState::seed(now);
        insert_on(&tx, user_id, &seed)?;
        tx.commit()?;
        tracing::info!(user = user_id, "created emotional state");
        Ok((seed, true))
    }

    pub fn load_state(&self, user_id: &str) -> Result<Option<EmotionalState>> {
        load_on(&self.conn, user_id)
    }

    /// Load, failing with `NotFound` when the user has no state.
    pub fn require_state(&self, user_id: &str) -> Result<EmotionalState> {
        self.load_state(user_id)?
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    /// Insert or overwrite the full state for `user_id`.
    pub fn save_state(&self, user_id: &str, state: &EmotionalState) -> Result<()> {
        let tx = self.immediate()?;
        if load_on(&tx, user_id)?.is_some() {
            update_on(&tx, user_id, state)?;
        } else {
            insert_on(&tx, user_id, state)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Atomic read-modify-write of one user's state. The write lock is taken
    /// before the read, so concurrent writers serialize rather than
    /// interleave. Fails with `NotFound` if the user has no state.
    pub fn update_state<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut EmotionalState) -> T,
    ) -> Result<T> {
        let tx = self.immediate()?;
        let mut state =
            load_on(&tx, user_id)?.ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        let out = f(&mut state);
        update_on(&tx, user_id, &state)?;
        tx.commit()?;
        Ok(out)
    }

    /// Apply `f` to every stored state inside one transaction. Returns the
    /// number of users touched.
    pub fn update_all(&self, mut f: impl FnMut(&str, &mut EmotionalState)) -> Result<usize> {
        let tx = self.immediate()?;
        let users = list_on(&tx)?;
        for user in &users {
            if let Some(mut state) = load_on(&tx, user)? {
                f(user, &mut state);
                update_on(&tx, user, &state)?;
            }
        }
        tx.commit()?;
        Ok(users.len())
    }

    /// Decay every stored user's mood one step toward baseline.
    pub fn decay_all(&self, engine: &EmotionEngine, now: i64) -> Result<usize> {
        let touched = self.update_all(|_, state| {
            engine.decay(state, now);
        })?;
        tracing::debug!("decayed {touched} emotional states");
        Ok(touched)
    }

    /// Remove a user's state. Returns whether a row existed.
    pub fn delete_state(&self, user_id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM emotional_states WHERE user_id = ?1", [user_id])?;
        if rows > 0 {
            tracing::info!(user = user_id, "deleted emotional state");
        }
        Ok(rows > 0)
    }

    pub fn list_users(&self) -> Result<Vec<String>> {
        list_on(&self.conn)
    }

    // --- JSON bridge ---

    pub fn export_json(&self, user_id: &str) -> Result<String> {
        let state = self.require_state(user_id)?;
        Ok(serde_json::to_string_pretty(&state)?)
    }

    /// Replace `user_id`'s state with the JSON document `json`. Out-of-range
    /// values are clamped and history is truncated before saving.
    pub fn import_json(&self, user_id: &str, json: &str) -> Result<EmotionalState> {
        let state: EmotionalState = serde_json::from_str(json)?;
        let state = state.normalized();
        self.save_state(user_id, &state)?;
        Ok(state)
    }

    // --- Maintenance ---

    /// Flush the WAL into the main database file and truncate it.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }

    fn immediate(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.checkpoint_truncate() {
            tracing::debug!("WAL checkpoint on close failed: {e}");
        }
    }
}

fn load_on(conn: &Connection, user_id: &str) -> Result<Option<EmotionalState>> {
    let row = conn
        .query_row(SELECT_STATE, [user_id], read_row)
        .optional()?;

    let Some((mood, baseline, history, last_updated)) = row else {
        return Ok(None);
    };

    let recent_emotions: Vec<EmotionRecord> = serde_json::from_str(&history).map_err(|e| {
        StoreError::InvalidData(format!("recent_emotions for '{user_id}': {e}"))
    })?;

    Ok(Some(EmotionalState {
        mood,
        baseline,
        recent_emotions,
        last_updated,
    }))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(MoodVector, MoodVector, String, i64)> {
    let mood = MoodVector::new(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?);
    let baseline = MoodVector::new(row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?);
    Ok((mood, baseline, row.get(10)?, row.get(11)?))
}

fn insert_on(conn: &Connection, user_id: &str, state: &EmotionalState) -> Result<()> {
    let history = serde_json::to_string(&state.recent_emotions)?;
    let m = &state.mood;
    let b = &state.baseline;
    conn.execute(
        "INSERT INTO emotional_states (
            user_id, valence, arousal, connection, curiosity, energy,
            baseline_valence, baseline_arousal, baseline_connection, baseline_curiosity, baseline_energy,
            recent_emotions, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            user_id,
            m.valence,
            m.arousal,
            m.connection,
            m.curiosity,
            m.energy,
            b.valence,
            b.arousal,
            b.connection,
            b.curiosity,
            b.energy,
            history,
            state.last_updated,
        ],
    )?;
    Ok(())
}

fn update_on(conn: &Connection, user_id: &str, state: &EmotionalState) -> Result<()> {
    let history = serde_json::to_string(&state.recent_emotions)?;
    let m = &state.mood;
    let b = &state.baseline;
    let rows = conn.execute(
        "UPDATE emotional_states SET
            valence = ?2, arousal = ?3, connection = ?4, curiosity = ?5, energy = ?6,
            baseline_valence = ?7, baseline_arousal = ?8, baseline_connection = ?9,
            baseline_curiosity = ?10, baseline_energy = ?11,
            recent_emotions = ?12, last_updated = ?13
         WHERE user_id = ?1",
        params![
            user_id,
            m.valence,
            m.arousal,
            m.connection,
            m.curiosity,
            m.energy,
            b.valence,
            b.arousal,
            b.connection,
            b.curiosity,
            b.energy,
            history,
            state.last_updated,
        ],
    )?;
    if rows == 0 {
        return Err(StoreError::NotFound(user_id.to_string()));
    }
    Ok(())
}

fn list_on(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT user_id FROM emotional_states ORDER BY user_id")?;
    let users = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<_, _>>()?;
    Ok(users)
}
