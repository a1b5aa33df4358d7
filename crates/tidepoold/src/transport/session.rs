//! Client sessions that forward SQL requests to the engine.
//!
//! Each session reads JSON lines of the form `{"sql": "..."}` and answers every
//! request with exactly one JSON line:
//!
//! ```text
//! {"kind":"rows","columns":["one"],"rows":[[1]]}
//! {"kind":"done","changes":1}
//! {"kind":"error","message":"..."}
//! ```
//!
//! The session ends when the client closes its half of the connection.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::engine::{EngineHandle, QueryOutcome, SqlValue};

use super::handler::RequestReader;
use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET};

#[derive(Debug, Deserialize)]
struct SessionRequest {
    sql: String,
}

/// One response line.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SessionResponse {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Done {
        changes: usize,
    },
    Error {
        message: String,
    },
}

impl SessionResponse {
    fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }
}

impl From<QueryOutcome> for SessionResponse {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Rows { columns, rows } => Self::Rows {
                columns,
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(json_value).collect())
                    .collect(),
            },
            QueryOutcome::Done { changes } => Self::Done { changes },
        }
    }
}

fn json_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(integer) => Value::from(integer),
        SqlValue::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        SqlValue::Text(text) => Value::String(text),
        SqlValue::Blob(bytes) => Value::String(bytea_hex(&bytes)),
    }
}

/// PostgreSQL `bytea` hex output, e.g. `\x00ff`.
fn bytea_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut encoded = String::with_capacity(2 + bytes.len() * 2);
    encoded.push_str("\\x");
    for byte in bytes {
        // Writing into a `String` is infallible.
        let _ = write!(encoded, "{byte:02x}");
    }
    encoded
}

/// Connection handler that serves SQL sessions against the shared engine.
///
/// The handler holds a clone of the engine handle and never closes it.
#[derive(Debug, Clone)]
pub struct EngineSessionHandler {
    engine: EngineHandle,
}

impl EngineSessionHandler {
    #[must_use]
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    fn serve(&self, mut stream: ConnectionStream) -> io::Result<()> {
        let mut reader = RequestReader::new(stream.try_clone()?);
        loop {
            let line = match reader.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(()),
                Err(error) if error.kind() == io::ErrorKind::InvalidData => {
                    // The rest of the oversized line cannot be framed, so the
                    // session ends after the error response.
                    write_response(&mut stream, &SessionResponse::error(&error))?;
                    return Ok(());
                }
                Err(error) => return Err(error),
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let response = self.respond(&line);
            write_response(&mut stream, &response)?;
        }
    }

    fn respond(&self, line: &[u8]) -> SessionResponse {
        let request = match serde_json::from_slice::<SessionRequest>(line) {
            Ok(request) => request,
            Err(error) => {
                debug!(target: LISTENER_TARGET, error = %error, "malformed request");
                return SessionResponse::error(format!("malformed request: {error}"));
            }
        };
        match self.engine.execute(&request.sql) {
            Ok(outcome) => outcome.into(),
            Err(error) => SessionResponse::error(error),
        }
    }
}

impl ConnectionHandler for EngineSessionHandler {
    fn handle(&self, stream: ConnectionStream) {
        if let Err(error) = self.serve(stream) {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "session ended with an error"
            );
        }
    }
}

fn write_response(stream: &mut ConnectionStream, response: &SessionResponse) -> io::Result<()> {
    serde_json::to_writer(&mut *stream, response)?;
    stream.write_all(b"\n")?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, EngineStorage, ExtensionSet};
    use rstest::{fixture, rstest};
    use std::io::{BufRead, BufReader};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    struct SessionFixture {
        engine: EngineHandle,
        client: TcpStream,
        server: thread::JoinHandle<()>,
    }

    #[fixture]
    fn session() -> SessionFixture {
        let engine =
            Engine::open(&EngineStorage::Memory, &ExtensionSet::new()).expect("open engine");
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let handler = EngineSessionHandler::new(engine.clone());
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            handler.handle(ConnectionStream::Tcp(stream));
        });
        let client = TcpStream::connect(addr).expect("connect client");
        SessionFixture {
            engine,
            client,
            server,
        }
    }

    fn exchange(client: &mut TcpStream, requests: &[&str]) -> Vec<Value> {
        let mut reader = BufReader::new(client.try_clone().expect("clone stream"));
        requests
            .iter()
            .map(|request| {
                client.write_all(request.as_bytes()).expect("write request");
                client.write_all(b"\n").expect("write newline");
                let mut line = String::new();
                reader.read_line(&mut line).expect("read response");
                serde_json::from_str(&line).expect("parse response")
            })
            .collect()
    }

    fn finish(fixture: SessionFixture) {
        let SessionFixture {
            engine,
            client,
            server,
        } = fixture;
        drop(client);
        server.join().expect("join session");
        engine.close().expect("close engine");
    }

    #[rstest]
    fn session_answers_each_request(mut session: SessionFixture) {
        let responses = exchange(
            &mut session.client,
            &[
                r#"{"sql": "CREATE TABLE t (n INTEGER)"}"#,
                r#"{"sql": "INSERT INTO t VALUES (7), (8)"}"#,
                r#"{"sql": "SELECT n FROM t ORDER BY n"}"#,
            ],
        );
        assert_eq!(responses[0]["kind"], "done");
        assert_eq!(responses[1], serde_json::json!({"kind": "done", "changes": 2}));
        assert_eq!(
            responses[2],
            serde_json::json!({"kind": "rows", "columns": ["n"], "rows": [[7], [8]]})
        );
        finish(session);
    }

    #[rstest]
    fn malformed_and_failing_requests_report_errors(mut session: SessionFixture) {
        let responses = exchange(
            &mut session.client,
            &["not json", r#"{"sql": "SELECT * FROM nowhere"}"#, r#"{"sql": "SELECT 1"}"#],
        );
        assert_eq!(responses[0]["kind"], "error");
        assert_eq!(responses[1]["kind"], "error");
        assert_eq!(responses[2]["kind"], "rows");
        finish(session);
    }

    #[rstest]
    #[case(SqlValue::Null, Value::Null)]
    #[case(SqlValue::Integer(-3), serde_json::json!(-3))]
    #[case(SqlValue::Real(1.5), serde_json::json!(1.5))]
    #[case(SqlValue::Text("tide".to_owned()), serde_json::json!("tide"))]
    #[case(SqlValue::Blob(vec![0x00, 0xff]), serde_json::json!("\\x00ff"))]
    #[case(SqlValue::Blob(Vec::new()), serde_json::json!("\\x"))]
    #[case(SqlValue::Blob(vec![0xde, 0xad, 0x0b, 0xee, 0x7f]), serde_json::json!("\\xdead0bee7f"))]
    fn values_map_to_json(#[case] value: SqlValue, #[case] expected: Value) {
        assert_eq!(json_value(value), expected);
    }
}
