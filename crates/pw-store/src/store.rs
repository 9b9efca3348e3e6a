//! The pane word index.
//!
//! SQLite connections must not be used from two threads at once, so one
//! dedicated thread owns the connection and serves requests from a channel,
//! one at a time, in submission order. Callers get a future per request and
//! never block on the database.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;
use std::time::Instant;

use rusqlite::{Connection, Row, params};
use tokio::sync::{mpsc, oneshot};

use pw_core::{like_escape, lower, normalize};

use crate::error::{Result, StoreError};
use crate::{functions, schema};

const SELECT_WORDS: &str = "
    SELECT pane_id, word
    FROM words
    WHERE X_NORM(X_LOWER(word)) LIKE X_LIKE_ESC(X_NORM(X_LOWER(?1))) ESCAPE '!'
    ORDER BY pane_id <> ?2, word COLLATE X_COLL";

// SQLite rejects LIKE patterns over this many bytes.
const MAX_LIKE_PATTERN_BYTES: usize = 50_000;

// Same rows as SELECT_WORDS for prefixes too long for LIKE.
const SELECT_WORDS_LONG_PREFIX: &str = "
    SELECT pane_id, word
    FROM words
    WHERE lower(substr(X_NORM(X_LOWER(word)), 1, length(?1))) = lower(?1)
    ORDER BY pane_id <> ?2, word COLLATE X_COLL";

/// One stored (pane, word) row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneWord {
    pub pane_id: String,
    pub word: String,
}

impl PaneWord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            pane_id: row.get("pane_id")?,
            word: row.get("word")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub panes: u64,
    pub words: u64,
}

struct SearchQuery {
    prefix: String,
    active_pane: String,
}

impl SearchQuery {
    fn new(prefix_len: usize, word: &str, active_pane: &str) -> Self {
        Self {
            prefix: word.chars().take(prefix_len).collect(),
            active_pane: active_pane.to_string(),
        }
    }
}

enum Request {
    Refresh {
        panes: Vec<(String, Vec<String>)>,
        reply: oneshot::Sender<Result<()>>,
    },
    Search {
        query: SearchQuery,
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
    SearchRows {
        query: SearchQuery,
        reply: oneshot::Sender<Result<Vec<PaneWord>>>,
    },
    Stats {
        reply: oneshot::Sender<Result<StoreStats>>,
    },
}

/// Reply to one submitted request.
///
/// The request is already queued when this is returned; dropping it does not
/// cancel the work.
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(StoreError::WorkerGone)))
    }
}

/// Query-only handle. This is what the ranker gets.
#[derive(Clone)]
pub struct WordReader {
    tx: mpsc::UnboundedSender<Request>,
}

impl WordReader {
    /// Words whose loose, case-folded form starts with the first
    /// `prefix_len` characters of `word`. Rows from `active_pane` come first,
    /// then locale order.
    pub fn search(&self, prefix_len: usize, word: &str, active_pane: &str) -> Pending<Vec<String>> {
        let query = SearchQuery::new(prefix_len, word, active_pane);
        submit(&self.tx, |reply| Request::Search { query, reply })
    }

    /// Like [`WordReader::search`], keeping the pane each match came from.
    pub fn search_rows(
        &self,
        prefix_len: usize,
        word: &str,
        active_pane: &str,
    ) -> Pending<Vec<PaneWord>> {
        let query = SearchQuery::new(prefix_len, word, active_pane);
        submit(&self.tx, |reply| Request::SearchRows { query, reply })
    }

    pub fn stats(&self) -> Pending<StoreStats> {
        submit(&self.tx, |reply| Request::Stats { reply })
    }

    /// False once the worker has stopped.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Owner handle: everything a reader can do, plus refresh.
#[derive(Clone)]
pub struct WordStore {
    reader: WordReader,
}

impl WordStore {
    /// Start the worker and initialize the connection at `location`
    /// (`:memory:` for a private in-memory index).
    pub async fn open(location: &str) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let location = location.to_string();

        thread::Builder::new()
            .name("pw-store".to_string())
            .spawn(move || run_worker(&location, rx, ready_tx))
            .map_err(StoreError::Spawn)?;

        ready_rx.await.unwrap_or(Err(StoreError::WorkerGone))?;
        Ok(Self {
            reader: WordReader { tx },
        })
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::open(":memory:").await
    }

    /// Replace the words of every pane in `panes`, in one transaction.
    /// Panes not named are left alone.
    pub fn refresh<I, K>(&self, panes: I) -> Pending<()>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let panes = panes
            .into_iter()
            .map(|(pane_id, words)| (pane_id.into(), words))
            .collect();
        submit(&self.reader.tx, |reply| Request::Refresh { panes, reply })
    }

    pub fn search(&self, prefix_len: usize, word: &str, active_pane: &str) -> Pending<Vec<String>> {
        self.reader.search(prefix_len, word, active_pane)
    }

    pub fn search_rows(
        &self,
        prefix_len: usize,
        word: &str,
        active_pane: &str,
    ) -> Pending<Vec<PaneWord>> {
        self.reader.search_rows(prefix_len, word, active_pane)
    }

    pub fn stats(&self) -> Pending<StoreStats> {
        self.reader.stats()
    }

    pub fn reader(&self) -> WordReader {
        self.reader.clone()
    }
}

fn submit<T>(
    tx: &mpsc::UnboundedSender<Request>,
    request: impl FnOnce(oneshot::Sender<Result<T>>) -> Request,
) -> Pending<T> {
    let (reply, rx) = oneshot::channel();
    if tx.send(request(reply)).is_err() {
        tracing::warn!("word store worker is gone, dropping request");
    }
    Pending { rx }
}

// ---------------------------------------------------------------------------
// Worker thread
// ---------------------------------------------------------------------------

fn open_connection(location: &str) -> Result<Connection> {
    let conn = Connection::open(location).map_err(StoreError::Init)?;
    functions::register(&conn).map_err(StoreError::Init)?;
    schema::initialize(&conn).map_err(StoreError::into_init)?;
    Ok(conn)
}

fn run_worker(
    location: &str,
    mut rx: mpsc::UnboundedReceiver<Request>,
    ready: oneshot::Sender<Result<()>>,
) {
    let mut conn = match open_connection(location) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("word store init failed for {location}: {e}");
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }
    tracing::info!("word store worker started on {location}");

    while let Some(request) = rx.blocking_recv() {
        match request {
            Request::Refresh { panes, reply } => {
                let result = refresh(&mut conn, &panes);
                respond("refresh", reply, result);
            }
            Request::Search { query, reply } => {
                let result = search(&conn, &query)
                    .map(|rows| rows.into_iter().map(|row| row.word).collect());
                respond("search", reply, result);
            }
            Request::SearchRows { query, reply } => {
                respond("search", reply, search(&conn, &query));
            }
            Request::Stats { reply } => {
                respond("stats", reply, stats(&conn));
            }
        }
    }

    tracing::info!("word store worker stopped");
}

fn respond<T>(op: &str, reply: oneshot::Sender<Result<T>>, result: Result<T>) {
    if let Err(Err(e)) = reply.send(result) {
        tracing::warn!("{op} failed with nobody waiting: {e}");
    }
}

fn refresh(conn: &mut Connection, panes: &[(String, Vec<String>)]) -> Result<()> {
    let started = Instant::now();
    let tx = conn.transaction()?;
    let mut inserted = 0usize;
    {
        let mut delete = tx.prepare_cached("DELETE FROM words WHERE pane_id = ?1")?;
        for (pane_id, _) in panes {
            delete.execute([pane_id])?;
        }

        let mut insert = tx.prepare_cached("INSERT INTO words (pane_id, word) VALUES (?1, ?2)")?;
        for (pane_id, words) in panes {
            for word in words {
                insert.execute(params![pane_id, word])?;
                inserted += 1;
            }
        }
    }
    tx.commit()?;

    tracing::debug!(
        "refreshed {} panes with {inserted} words in {:?}",
        panes.len(),
        started.elapsed()
    );
    Ok(())
}

fn search(conn: &Connection, query: &SearchQuery) -> Result<Vec<PaneWord>> {
    let loose = normalize(&lower(&query.prefix));
    let (sql, prefix) = if like_escape(&loose).len() > MAX_LIKE_PATTERN_BYTES {
        tracing::debug!("prefix of {} bytes is too long for LIKE", loose.len());
        (SELECT_WORDS_LONG_PREFIX, loose.as_str())
    } else {
        (SELECT_WORDS, query.prefix.as_str())
    };

    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt
        .query_map(params![prefix, query.active_pane], PaneWord::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    tracing::trace!(
        "search {:?} in {}: {} matches",
        query.prefix,
        query.active_pane,
        rows.len()
    );
    Ok(rows)
}

fn stats(conn: &Connection) -> Result<StoreStats> {
    let (panes, words): (i64, i64) = conn.query_row(
        "SELECT COUNT(DISTINCT pane_id), COUNT(*) FROM words",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(StoreStats {
        panes: panes as u64,
        words: words as u64,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|s| s.to_string()).collect()
    }

    async fn store() -> WordStore {
        WordStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = store().await;
        assert!(store.reader().is_running());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { panes: 0, words: 0 });
    }

    #[tokio::test]
    async fn test_open_bad_location_fails_init() {
        let result = WordStore::open("/nonexistent-dir/for/sure/words.db").await;
        assert!(matches!(result, Err(StoreError::Init(_))));
    }

    #[tokio::test]
    async fn test_alpha_beta_alphabet() {
        let store = store().await;
        store
            .refresh([
                ("p1", words(&["alpha", "beta"])),
                ("p2", words(&["alphabet"])),
            ])
            .await
            .unwrap();

        let found = store.search(5, "alpha", "p1").await.unwrap();
        assert_eq!(found, vec!["alpha", "alphabet"]);
    }

    #[tokio::test]
    async fn test_refresh_replaces_pane_snapshot() {
        let store = store().await;
        store
            .refresh([("a", words(&["first", "fizz"]))])
            .await
            .unwrap();
        store
            .refresh([("a", words(&["fresh"]))])
            .await
            .unwrap();

        let found = store.search(1, "f", "a").await.unwrap();
        assert_eq!(found, vec!["fresh"]);
    }

    #[tokio::test]
    async fn test_refresh_leaves_other_panes() {
        let store = store().await;
        store.refresh([("a", words(&["x"]))]).await.unwrap();
        store.refresh([("b", words(&["y"]))]).await.unwrap();

        let found = store.search(1, "x", "a").await.unwrap();
        assert_eq!(found, vec!["x"]);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { panes: 2, words: 2 });
    }

    #[tokio::test]
    async fn test_refresh_with_empty_words_clears_pane() {
        let store = store().await;
        store.refresh([("a", words(&["gone"]))]).await.unwrap();
        store.refresh([("a", Vec::new())]).await.unwrap();

        assert!(store.search(2, "go", "a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_accepts_maps() {
        let store = store().await;
        let mut panes = BTreeMap::new();
        panes.insert("%1".to_string(), words(&["tmux", "pane"]));
        panes.insert("%2".to_string(), words(&["pane"]));
        store.refresh(panes).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { panes: 2, words: 3 });
    }

    #[tokio::test]
    async fn test_prefix_match() {
        let store = store().await;
        store
            .refresh([("p", words(&["function", "fun", "xylophone"]))])
            .await
            .unwrap();

        let found = store.search(4, "func", "p").await.unwrap();
        assert_eq!(found, vec!["function"]);
        let found = store.search(4, "xyz", "p").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_len_cuts_the_word() {
        let store = store().await;
        store
            .refresh([("p", words(&["function", "fun", "fox"]))])
            .await
            .unwrap();

        let found = store.search(2, "fuzzy", "p").await.unwrap();
        assert_eq!(found, vec!["fun", "function"]);
    }

    #[tokio::test]
    async fn test_prefix_len_longer_than_word() {
        let store = store().await;
        store
            .refresh([("p", words(&["abc", "abcd", "b"]))])
            .await
            .unwrap();

        let found = store.search(100, "abc", "p").await.unwrap();
        assert_eq!(found, vec!["abc", "abcd"]);
    }

    #[tokio::test]
    async fn test_zero_prefix_matches_everything() {
        let store = store().await;
        store
            .refresh([("p", words(&["b", "a"]))])
            .await
            .unwrap();

        let found = store.search(0, "zzz", "p").await.unwrap();
        assert_eq!(found, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_case_insensitive() {
        let store = store().await;
        store
            .refresh([("p", words(&["HashMap", "hashbrown"]))])
            .await
            .unwrap();

        let found = store.search(4, "HASH", "p").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_diacritics_ignored() {
        let store = store().await;
        store
            .refresh([("p", words(&["café", "cafeteria"]))])
            .await
            .unwrap();

        let found = store.search(4, "cafe", "p").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&"café".to_string()));

        let found = store.search(4, "Café", "p").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_wildcards_in_prefix_are_literal() {
        let store = store().await;
        store
            .refresh([("p", words(&["abc", "a_c", "a%c", "a!c"]))])
            .await
            .unwrap();

        assert_eq!(store.search(2, "a_", "p").await.unwrap(), vec!["a_c"]);
        assert_eq!(store.search(2, "a%", "p").await.unwrap(), vec!["a%c"]);
        assert_eq!(store.search(2, "a!", "p").await.unwrap(), vec!["a!c"]);
        assert!(store.search(1, "%", "p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_over_like_limit() {
        let store = store().await;
        let long = "a".repeat(60_001);
        let percents = format!("{}x", "%".repeat(30_000));
        store
            .refresh([("p", vec!["abc".to_string(), long.clone(), percents.clone()])])
            .await
            .unwrap();

        let found = store.search(60_000, &"A".repeat(60_000), "p").await.unwrap();
        assert_eq!(found, vec![long]);
        // escaping doubles the pattern, so this one also skips LIKE
        let found = store.search(30_000, &percents, "p").await.unwrap();
        assert_eq!(found, vec![percents]);

        assert_eq!(store.search(2, "ab", "p").await.unwrap(), vec!["abc"]);
    }

    #[test]
    fn test_failed_refresh_rolls_back() {
        let mut conn = open_connection(":memory:").unwrap();
        let panes = |a: &[&str], b: &[&str]| {
            vec![("a".to_string(), words(a)), ("b".to_string(), words(b))]
        };
        refresh(&mut conn, &panes(&["old"], &["other"])).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_bad BEFORE INSERT ON words
             WHEN NEW.word = 'bad'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        let result = refresh(&mut conn, &panes(&["new", "bad"], &[]));
        assert!(matches!(result, Err(StoreError::Query(_))));

        let rows = search(&conn, &SearchQuery::new(0, "", "a")).unwrap();
        let found: Vec<_> = rows
            .iter()
            .map(|r| (r.pane_id.as_str(), r.word.as_str()))
            .collect();
        assert_eq!(found, vec![("a", "old"), ("b", "other")]);
    }

    #[tokio::test]
    async fn test_active_pane_first() {
        let store = store().await;
        store
            .refresh([("B", words(&["foo", "aaa"])), ("A", words(&["foo", "zzz"]))])
            .await
            .unwrap();

        let rows = store.search_rows(3, "foo", "A").await.unwrap();
        assert_eq!(
            rows,
            vec![
                PaneWord {
                    pane_id: "A".to_string(),
                    word: "foo".to_string()
                },
                PaneWord {
                    pane_id: "B".to_string(),
                    word: "foo".to_string()
                },
            ]
        );

        let all = store.search(0, "", "A").await.unwrap();
        assert_eq!(all, vec!["foo", "zzz", "aaa", "foo"]);
    }

    #[tokio::test]
    async fn test_unknown_active_pane_is_plain_order() {
        let store = store().await;
        store
            .refresh([("a", words(&["mango"])), ("b", words(&["melon"]))])
            .await
            .unwrap();

        let found = store.search(1, "m", "nope").await.unwrap();
        assert_eq!(found, vec!["mango", "melon"]);
    }

    #[tokio::test]
    async fn test_requests_run_in_submission_order() {
        let store = store().await;
        // not awaited: the search below is queued after it
        let refresh = store.refresh([("p", words(&["queued"]))]);
        let found = store.search(3, "que", "p").await.unwrap();
        assert_eq!(found, vec!["queued"]);
        refresh.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_refresh_still_applies() {
        let store = store().await;
        drop(store.refresh([("p", words(&["fire", "forget"]))]));

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.words, 2);
    }

    #[tokio::test]
    async fn test_reader_sees_owner_writes() {
        let store = store().await;
        let reader = store.reader();
        store.refresh([("p", words(&["shared"]))]).await.unwrap();

        assert_eq!(reader.search(3, "sha", "p").await.unwrap(), vec!["shared"]);
    }

    #[tokio::test]
    async fn test_reader_outlives_owner() {
        let store = store().await;
        store.refresh([("p", words(&["kept"]))]).await.unwrap();
        let reader = store.reader();
        drop(store);

        assert!(reader.is_running());
        assert_eq!(reader.search(2, "ke", "p").await.unwrap(), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_file_location() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("words.db");

        let store = WordStore::open(path.to_str().unwrap()).await.unwrap();
        store.refresh([("p", words(&["disk"]))]).await.unwrap();
        assert_eq!(store.search(2, "di", "p").await.unwrap(), vec!["disk"]);
        assert!(path.exists());
    }
}
