//! Entry operations on a single store.
//!
//! Entries are keyed by request identity (see [`super::hash`]). Every write
//! is an UPSERT, so writing the same key twice leaves one entry holding the
//! latest response.

use super::hash::compute_cache_key;
use super::stores::CacheStore;
use crate::{Error, Request, Response};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Transaction};

struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    final_url: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn encode(request: &Request, response: &Response) -> Result<Self, Error> {
        response.check_storable()?;
        Ok(Self {
            key_hash: compute_cache_key(&request.method, request.url.as_str()),
            method: request.method.to_ascii_uppercase(),
            url: request.url.to_string(),
            final_url: response.url.clone(),
            status_code: i64::from(response.status),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

fn ensure_store(tx: &Transaction<'_>, name: &str, now: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![name, now],
    )?;
    Ok(())
}

fn upsert(tx: &Transaction<'_>, store: &str, row: &EntryRow, now: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO cache_entries (
            store_name, key_hash, method, url, final_url,
            status_code, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(store_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            final_url = excluded.final_url,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            &row.key_hash,
            &row.method,
            &row.url,
            &row.final_url,
            row.status_code,
            &row.headers_json,
            &row.body,
            now,
        ],
    )?;
    Ok(())
}

impl CacheStore {
    /// Store `response` under `request`, creating the store if needed.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_all(&[(request.clone(), response.clone())]).await
    }

    /// Store every pair in one transaction: either all land or none do.
    ///
    /// Creates the store if it does not exist yet. Existing entries with the
    /// same request identity are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unstorable`] before touching the database if any
    /// response is partial content, or a database error if the transaction
    /// fails. Either way nothing is written.
    pub async fn put_all(&self, pairs: &[(Request, Response)]) -> Result<(), Error> {
        let rows = pairs
            .iter()
            .map(|(req, res)| EntryRow::encode(req, res))
            .collect::<Result<Vec<_>, _>>()?;
        let name = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_store(&tx, &name, &now)?;
                for row in &rows {
                    upsert(&tx, &name, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for `request`.
    pub async fn get(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = compute_cache_key(&request.method, request.url.as_str());
        let name = self.name.clone();

        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<(String, i64, String, Vec<u8>)>, Error> {
                let result = conn.query_row(
                    "SELECT final_url, status_code, headers_json, body
                     FROM cache_entries WHERE store_name = ?1 AND key_hash = ?2",
                    params![name, key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((final_url, status, headers_json, body)) = row else {
            return Ok(None);
        };

        let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;

        Ok(Some(Response { url: final_url, status, headers, body: Bytes::from(body) }))
    }

    /// Number of entries in this store.
    pub async fn len(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE store_name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
