//! [`SqliteStore`] — the SQLite implementation of [`CustodyStore`].
//!
//! Every compound operation runs inside one [`tokio_rusqlite`] call on the
//! store's single connection, wrapped in an explicit SQL transaction. The
//! connection funnels all database work through one thread, so concurrent
//! transitions on the same tag serialize: the loser of an assign race
//! observes the winner's committed custody row and fails with a conflict
//! before writing anything.
//!
//! Domain refusals discovered inside a closure are smuggled out as the
//! inner `Result` of a nested `Result`, so rollback happens by simply not
//! reaching `commit`.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use keyward_core::{
  custody::{self, CustodyState, Transition},
  key::{Key, KeyPatch, NewKey},
  ledger::{LedgerRecord, NewRecord, RecordPatch},
  principal::Principal,
  store::CustodyStore,
  user::{NewUser, User, UserPatch},
  validate,
};

use crate::{
  Error, Result,
  encode::{RawKey, RawRecord, RawUser, encode_dt, encode_locations, encode_uuid},
  schema::SCHEMA,
};

/// The inner result of a store closure: `Err` is a domain refusal that must
/// roll the transaction back and surface as [`Error::Domain`].
type DomainOut<T> = std::result::Result<T, keyward_core::Error>;

const ADMIN_EMAIL_SETTING: &str = "admin_email";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Keyward custody store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn row_exists(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, params, |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

const KEY_SELECT: &str = "SELECT
    k.tag_number, k.series_id, k.sequence_id, k.building,
    k.key_type, k.location, k.comment, k.created_at,
    c.pid
  FROM keys k
  LEFT JOIN custody c ON c.tag_number = k.tag_number";

fn key_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawKey> {
  Ok(RawKey {
    tag_number:  row.get(0)?,
    series_id:   row.get(1)?,
    sequence_id: row.get(2)?,
    building:    row.get(3)?,
    key_type:    row.get(4)?,
    location:    row.get(5)?,
    comment:     row.get(6)?,
    created_at:  row.get(7)?,
    owner:       row.get(8)?,
  })
}

fn fetch_key(
  conn: &rusqlite::Connection,
  tag: &str,
) -> rusqlite::Result<Option<RawKey>> {
  conn
    .query_row(
      &format!("{KEY_SELECT} WHERE k.tag_number = ?1"),
      rusqlite::params![tag],
      key_from_row,
    )
    .optional()
}

fn custody_owner(
  conn: &rusqlite::Connection,
  tag: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT pid FROM custody WHERE tag_number = ?1",
      rusqlite::params![tag],
      |r| r.get(0),
    )
    .optional()
}

fn owned_tags(
  conn: &rusqlite::Connection,
  pid: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn
    .prepare("SELECT tag_number FROM custody WHERE pid = ?1 ORDER BY tag_number")?;
  let tags = stmt
    .query_map(rusqlite::params![pid], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(tags)
}

fn fetch_user(
  conn: &rusqlite::Connection,
  pid: &str,
) -> rusqlite::Result<Option<RawUser>> {
  let row = conn
    .query_row(
      "SELECT pid, full_name, role, created_at FROM users WHERE pid = ?1",
      rusqlite::params![pid],
      |r| {
        Ok((
          r.get::<_, String>(0)?,
          r.get::<_, String>(1)?,
          r.get::<_, String>(2)?,
          r.get::<_, String>(3)?,
        ))
      },
    )
    .optional()?;

  match row {
    None => Ok(None),
    Some((pid, full_name, role, created_at)) => {
      let owned_keys = owned_tags(conn, &pid)?;
      Ok(Some(RawUser { pid, full_name, role, created_at, owned_keys }))
    }
  }
}

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawRecord> {
  Ok(RawRecord {
    record_id:  row.get(0)?,
    tag_number: row.get(1)?,
    pid:        row.get(2)?,
    date:       row.get(3)?,
    exchange:   row.get(4)?,
    comment:    row.get(5)?,
  })
}

fn fetch_record(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawRecord>> {
  conn
    .query_row(
      "SELECT record_id, tag_number, pid, date, exchange, comment
       FROM ledger WHERE record_id = ?1",
      rusqlite::params![id],
      record_from_row,
    )
    .optional()
}

fn insert_ledger_row(
  conn: &rusqlite::Connection,
  record: &LedgerRecord,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO ledger (record_id, tag_number, pid, date, exchange, comment)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(record.record_id),
      record.tag_number,
      record.pid,
      encode_dt(record.date),
      record.exchange.to_string(),
      record.comment,
    ],
  )?;
  Ok(())
}

// ─── CustodyStore impl ───────────────────────────────────────────────────────

impl CustodyStore for SqliteStore {
  type Error = Error;

  // ── Key registry ──────────────────────────────────────────────────────────

  async fn list_keys(&self) -> Result<Vec<Key>> {
    let raws: Vec<RawKey> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("{KEY_SELECT} ORDER BY k.tag_number"))?;
        let rows = stmt
          .query_map([], key_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawKey::into_key).collect()
  }

  async fn get_key(&self, tag: &str) -> Result<Option<Key>> {
    let tag = tag.to_owned();
    let raw: Option<RawKey> =
      self.conn.call(move |conn| Ok(fetch_key(conn, &tag)?)).await?;
    raw.map(RawKey::into_key).transpose()
  }

  async fn add_key(&self, input: NewKey) -> Result<Key> {
    input.validate().map_err(Error::Domain)?;

    let key = Key {
      tag_number:   input.tag_number,
      series_id:    input.series_id,
      sequence_id:  input.sequence_id,
      building:     input.building,
      key_type:     input.key_type,
      location:     input.location,
      comment:      input.comment,
      is_available: true,
      created_at:   Utc::now(),
    };

    let tag          = key.tag_number.clone();
    let series       = key.series_id.clone();
    let sequence     = key.sequence_id;
    let building     = key.building.clone();
    let key_type     = key.key_type.to_string();
    let location     = encode_locations(&key.location)?;
    let comment      = key.comment.clone();
    let created_at   = encode_dt(key.created_at);

    let out: DomainOut<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if row_exists(
          &tx,
          "SELECT 1 FROM keys WHERE tag_number = ?1",
          rusqlite::params![tag],
        )? {
          return Ok(Err(keyward_core::Error::DuplicateTag(tag)));
        }
        if row_exists(
          &tx,
          "SELECT 1 FROM keys WHERE series_id = ?1 AND sequence_id = ?2",
          rusqlite::params![series, sequence],
        )? {
          return Ok(Err(keyward_core::Error::DuplicateSeries {
            series_id:   series,
            sequence_id: sequence,
          }));
        }

        tx.execute(
          "INSERT INTO keys (
             tag_number, series_id, sequence_id, building,
             key_type, location, comment, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            tag, series, sequence, building, key_type, location, comment,
            created_at,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    out?;

    Ok(key)
  }

  async fn update_key(&self, tag: &str, patch: KeyPatch) -> Result<Key> {
    patch.validate().map_err(Error::Domain)?;

    let old_tag = tag.to_owned();
    let location_json = patch
      .location
      .as_deref()
      .map(encode_locations)
      .transpose()?;

    let out: DomainOut<RawKey> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current = match fetch_key(&tx, &old_tag)? {
          Some(raw) => raw,
          None => return Ok(Err(keyward_core::Error::KeyNotFound(old_tag))),
        };

        let new_tag      = patch.tag_number.unwrap_or_else(|| current.tag_number.clone());
        let new_series   = patch.series_id.unwrap_or_else(|| current.series_id.clone());
        let new_sequence = patch.sequence_id.unwrap_or(current.sequence_id);
        let new_building = patch.building.unwrap_or_else(|| current.building.clone());
        let new_key_type = patch
          .key_type
          .map(|kt| kt.to_string())
          .unwrap_or_else(|| current.key_type.clone());
        let new_location = location_json.unwrap_or_else(|| current.location.clone());
        let new_comment  = patch.comment.unwrap_or_else(|| current.comment.clone());

        // Rename: the new tag must not collide with another key.
        if new_tag != old_tag
          && row_exists(
            &tx,
            "SELECT 1 FROM keys WHERE tag_number = ?1",
            rusqlite::params![new_tag],
          )?
        {
          return Ok(Err(keyward_core::Error::DuplicateTag(new_tag)));
        }

        if (new_series != current.series_id || new_sequence != current.sequence_id)
          && row_exists(
            &tx,
            "SELECT 1 FROM keys
             WHERE series_id = ?1 AND sequence_id = ?2 AND tag_number != ?3",
            rusqlite::params![new_series, new_sequence, old_tag],
          )?
        {
          return Ok(Err(keyward_core::Error::DuplicateSeries {
            series_id:   new_series,
            sequence_id: new_sequence,
          }));
        }

        // Custody follows the rename via ON UPDATE CASCADE; the ledger is
        // deliberately left alone.
        tx.execute(
          "UPDATE keys SET
             tag_number = ?1, series_id = ?2, sequence_id = ?3,
             building = ?4, key_type = ?5, location = ?6, comment = ?7
           WHERE tag_number = ?8",
          rusqlite::params![
            new_tag, new_series, new_sequence, new_building, new_key_type,
            new_location, new_comment, old_tag,
          ],
        )?;
        tx.commit()?;

        Ok(Ok(RawKey {
          tag_number:  new_tag,
          series_id:   new_series,
          sequence_id: new_sequence,
          building:    new_building,
          key_type:    new_key_type,
          location:    new_location,
          comment:     new_comment,
          created_at:  current.created_at,
          owner:       current.owner,
        }))
      })
      .await?;

    out?.into_key()
  }

  async fn delete_key(&self, tag: &str) -> Result<()> {
    let tag = tag.to_owned();

    let out: DomainOut<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(
          &tx,
          "SELECT 1 FROM keys WHERE tag_number = ?1",
          rusqlite::params![tag],
        )? {
          return Ok(Err(keyward_core::Error::KeyNotFound(tag)));
        }
        if custody_owner(&tx, &tag)?.is_some() {
          return Ok(Err(keyward_core::Error::DeleteOwnedKey(tag)));
        }

        tx.execute(
          "DELETE FROM keys WHERE tag_number = ?1",
          rusqlite::params![tag],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    out?;
    Ok(())
  }

  async fn key_owner(&self, tag: &str) -> Result<Option<User>> {
    let tag = tag.to_owned();

    let out: DomainOut<Option<RawUser>> = self
      .conn
      .call(move |conn| {
        if !row_exists(
          conn,
          "SELECT 1 FROM keys WHERE tag_number = ?1",
          rusqlite::params![tag],
        )? {
          return Ok(Err(keyward_core::Error::KeyNotFound(tag)));
        }
        match custody_owner(conn, &tag)? {
          None => Ok(Ok(None)),
          Some(pid) => Ok(Ok(fetch_user(conn, &pid)?)),
        }
      })
      .await?;

    out?.map(RawUser::into_user).transpose()
  }

  async fn reconcile_key(&self, tag: &str) -> Result<()> {
    let tag = tag.to_owned();

    let out: DomainOut<()> = self
      .conn
      .call(move |conn| {
        if !row_exists(
          conn,
          "SELECT 1 FROM keys WHERE tag_number = ?1",
          rusqlite::params![tag],
        )? {
          return Ok(Err(keyward_core::Error::KeyNotFound(tag)));
        }
        match custody_owner(conn, &tag)? {
          Some(owner) => {
            Ok(Err(keyward_core::Error::StillOwned { tag, owner }))
          }
          // Availability is derived from custody, so there is nothing to
          // repair; an unowned key is already available.
          None => Ok(Ok(())),
        }
      })
      .await?;
    out?;
    Ok(())
  }

  // ── User directory ────────────────────────────────────────────────────────

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT pid, full_name, role, created_at FROM users ORDER BY pid",
        )?;
        let mut users = stmt
          .query_map([], |r| {
            Ok(RawUser {
              pid:        r.get(0)?,
              full_name:  r.get(1)?,
              role:       r.get(2)?,
              created_at: r.get(3)?,
              owned_keys: Vec::new(),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        for user in &mut users {
          user.owned_keys = owned_tags(conn, &user.pid)?;
        }
        Ok(users)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn get_user(&self, pid: &str) -> Result<Option<User>> {
    let pid = pid.to_owned();
    let raw: Option<RawUser> =
      self.conn.call(move |conn| Ok(fetch_user(conn, &pid)?)).await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_name(&self, full_name: &str) -> Result<Option<User>> {
    let full_name = full_name.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        // Names are not unique; this deliberately returns an arbitrary
        // match among duplicates.
        let pid: Option<String> = conn
          .query_row(
            "SELECT pid FROM users WHERE full_name = ?1 LIMIT 1",
            rusqlite::params![full_name],
            |r| r.get(0),
          )
          .optional()?;
        match pid {
          None => Ok(None),
          Some(pid) => Ok(fetch_user(conn, &pid)?),
        }
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn add_user(&self, input: NewUser) -> Result<User> {
    input.validate().map_err(Error::Domain)?;

    let user = User {
      pid:        input.pid,
      full_name:  input.full_name,
      role:       input.role,
      owned_keys: Vec::new(),
      created_at: Utc::now(),
    };

    let pid        = user.pid.clone();
    let full_name  = user.full_name.clone();
    let role       = user.role.to_string();
    let created_at = encode_dt(user.created_at);

    let out: DomainOut<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if row_exists(
          &tx,
          "SELECT 1 FROM users WHERE pid = ?1",
          rusqlite::params![pid],
        )? {
          return Ok(Err(keyward_core::Error::DuplicatePid(pid)));
        }
        tx.execute(
          "INSERT INTO users (pid, full_name, role, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![pid, full_name, role, created_at],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    out?;

    Ok(user)
  }

  async fn update_user(
    &self,
    pid: &str,
    patch: UserPatch,
    acting: &Principal,
  ) -> Result<User> {
    patch.validate().map_err(Error::Domain)?;

    // Self-lockout prevention: nobody edits their own role, whatever the
    // requested value.
    if patch.role.is_some() && acting.pid == pid {
      return Err(Error::Domain(keyward_core::Error::SelfRoleChange));
    }

    let pid = pid.to_owned();

    let out: DomainOut<RawUser> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current = match fetch_user(&tx, &pid)? {
          Some(raw) => raw,
          None => return Ok(Err(keyward_core::Error::UserNotFound(pid))),
        };

        let full_name = patch.full_name.unwrap_or(current.full_name);
        let role = patch
          .role
          .map(|r| r.to_string())
          .unwrap_or(current.role);

        tx.execute(
          "UPDATE users SET full_name = ?1, role = ?2 WHERE pid = ?3",
          rusqlite::params![full_name, role, pid],
        )?;
        tx.commit()?;

        Ok(Ok(RawUser {
          pid,
          full_name,
          role,
          created_at: current.created_at,
          owned_keys: current.owned_keys,
        }))
      })
      .await?;

    out?.into_user()
  }

  async fn delete_user(&self, pid: &str) -> Result<()> {
    let pid = pid.to_owned();

    let out: DomainOut<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(
          &tx,
          "SELECT 1 FROM users WHERE pid = ?1",
          rusqlite::params![pid],
        )? {
          return Ok(Err(keyward_core::Error::UserNotFound(pid)));
        }

        let count = owned_tags(&tx, &pid)?.len();
        if count > 0 {
          return Ok(Err(keyward_core::Error::DeleteKeyHolder { pid, count }));
        }

        tx.execute("DELETE FROM users WHERE pid = ?1", rusqlite::params![pid])?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    out?;
    Ok(())
  }

  async fn owned_keys(&self, pid: &str) -> Result<Vec<Key>> {
    let pid = pid.to_owned();

    let out: DomainOut<Vec<RawKey>> = self
      .conn
      .call(move |conn| {
        if !row_exists(
          conn,
          "SELECT 1 FROM users WHERE pid = ?1",
          rusqlite::params![pid],
        )? {
          return Ok(Err(keyward_core::Error::UserNotFound(pid)));
        }

        let mut stmt = conn.prepare(&format!(
          "{KEY_SELECT} WHERE c.pid = ?1 ORDER BY k.tag_number"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pid], key_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Ok(rows))
      })
      .await?;

    out?.into_iter().map(RawKey::into_key).collect()
  }

  // ── Custody transitions ───────────────────────────────────────────────────

  async fn transition(
    &self,
    tag: &str,
    transition: Transition,
  ) -> Result<LedgerRecord> {
    let tag = tag.to_owned();

    let out: DomainOut<LedgerRecord> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if !row_exists(
          &tx,
          "SELECT 1 FROM keys WHERE tag_number = ?1",
          rusqlite::params![tag],
        )? {
          return Ok(Err(keyward_core::Error::KeyNotFound(tag)));
        }

        // Assign needs a resolvable user; an unknown pid is NotFound so an
        // administrator can force-create the user and retry.
        if let Transition::Assign { pid } = &transition
          && !row_exists(
            &tx,
            "SELECT 1 FROM users WHERE pid = ?1",
            rusqlite::params![pid],
          )?
        {
          return Ok(Err(keyward_core::Error::UserNotFound(pid.clone())));
        }

        let state = CustodyState::from_owner(custody_owner(&tx, &tag)?);
        let effect = match custody::apply(&tag, &state, &transition) {
          Ok(effect) => effect,
          Err(e) => return Ok(Err(e)),
        };

        let now = Utc::now();
        match &effect.next {
          CustodyState::Owned { pid } => {
            tx.execute(
              "INSERT INTO custody (tag_number, pid, acquired_at)
               VALUES (?1, ?2, ?3)",
              rusqlite::params![tag, pid, encode_dt(now)],
            )?;
          }
          CustodyState::Available => {
            tx.execute(
              "DELETE FROM custody WHERE tag_number = ?1",
              rusqlite::params![tag],
            )?;
          }
        }

        let record = LedgerRecord {
          record_id:  Uuid::new_v4(),
          tag_number: tag,
          pid:        effect.pid,
          date:       now,
          exchange:   effect.exchange,
          comment:    effect.comment,
        };
        insert_ledger_row(&tx, &record)?;
        tx.commit()?;

        Ok(Ok(record))
      })
      .await?;

    Ok(out?)
  }

  // ── Ledger ────────────────────────────────────────────────────────────────

  async fn list_records(&self) -> Result<Vec<LedgerRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT record_id, tag_number, pid, date, exchange, comment
           FROM ledger ORDER BY date DESC",
        )?;
        let rows = stmt
          .query_map([], record_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn get_record(&self, id: Uuid) -> Result<Option<LedgerRecord>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| Ok(fetch_record(conn, &id_str)?))
      .await?;
    raw.map(RawRecord::into_record).transpose()
  }

  async fn append_record(&self, input: NewRecord) -> Result<LedgerRecord> {
    input.validate().map_err(Error::Domain)?;

    let record = LedgerRecord {
      record_id:  Uuid::new_v4(),
      tag_number: input.tag_number,
      pid:        input.pid,
      date:       input.date.unwrap_or_else(Utc::now),
      exchange:   input.exchange,
      comment:    input.comment,
    };

    let row = record.clone();
    self
      .conn
      .call(move |conn| {
        insert_ledger_row(conn, &row)?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn update_record(
    &self,
    id: Uuid,
    patch: RecordPatch,
  ) -> Result<LedgerRecord> {
    patch.validate().map_err(Error::Domain)?;

    let id_str = encode_uuid(id);
    let date_str = patch.date.map(encode_dt);
    let exchange_str = patch.exchange.map(|e| e.to_string());

    let out: DomainOut<RawRecord> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current = match fetch_record(&tx, &id_str)? {
          Some(raw) => raw,
          None => return Ok(Err(keyward_core::Error::RecordNotFound(id))),
        };

        let updated = RawRecord {
          record_id:  current.record_id,
          tag_number: patch.tag_number.unwrap_or(current.tag_number),
          pid:        patch.pid.unwrap_or(current.pid),
          date:       date_str.unwrap_or(current.date),
          exchange:   exchange_str.unwrap_or(current.exchange),
          comment:    patch.comment.unwrap_or(current.comment),
        };

        tx.execute(
          "UPDATE ledger SET
             tag_number = ?1, pid = ?2, date = ?3, exchange = ?4, comment = ?5
           WHERE record_id = ?6",
          rusqlite::params![
            updated.tag_number,
            updated.pid,
            updated.date,
            updated.exchange,
            updated.comment,
            id_str,
          ],
        )?;
        tx.commit()?;

        Ok(Ok(updated))
      })
      .await?;

    out?.into_record()
  }

  async fn delete_record(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let out: DomainOut<()> = self
      .conn
      .call(move |conn| {
        let deleted = conn.execute(
          "DELETE FROM ledger WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?;
        if deleted == 0 {
          return Ok(Err(keyward_core::Error::RecordNotFound(id)));
        }
        Ok(Ok(()))
      })
      .await?;
    out?;
    Ok(())
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn admin_email(&self) -> Result<Option<String>> {
    let value: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM settings WHERE name = ?1",
              rusqlite::params![ADMIN_EMAIL_SETTING],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set_admin_email(&self, email: &str) -> Result<()> {
    validate::email(email).map_err(Error::Domain)?;

    let email = email.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (name, value) VALUES (?1, ?2)
           ON CONFLICT(name) DO UPDATE SET value = excluded.value",
          rusqlite::params![ADMIN_EMAIL_SETTING, email],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
