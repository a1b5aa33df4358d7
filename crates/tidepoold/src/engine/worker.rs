//! Worker loop that exclusively owns the engine connection.

use std::sync::mpsc::{Receiver, Sender};

use rusqlite::Connection;
use tracing::{debug, warn};

use super::{ENGINE_TARGET, EngineError, QueryOutcome, SqlValue};

pub(super) enum EngineCommand {
    Execute {
        sql: String,
        reply: Sender<Result<QueryOutcome, EngineError>>,
    },
    Close {
        reply: Sender<Result<(), EngineError>>,
    },
}

pub(super) fn run_worker(connection: Connection, commands: Receiver<EngineCommand>) {
    while let Ok(command) = commands.recv() {
        match command {
            EngineCommand::Execute { sql, reply } => {
                let result = run_statement(&connection, &sql)
                    .map_err(|source| EngineError::Statement { source });
                if let Err(error) = &result {
                    debug!(target: ENGINE_TARGET, error = %error, "statement failed");
                }
                let _ = reply.send(result);
            }
            EngineCommand::Close { reply } => {
                let result = connection
                    .close()
                    .map_err(|(_, source)| EngineError::Close { source });
                let _ = reply.send(result);
                return;
            }
        }
    }

    // Every sender was dropped without a close request.
    warn!(
        target: ENGINE_TARGET,
        "engine worker exiting without an explicit close"
    );
}

fn run_statement(connection: &Connection, sql: &str) -> Result<QueryOutcome, rusqlite::Error> {
    let mut statement = connection.prepare(sql)?;
    let column_count = statement.column_count();
    if column_count == 0 {
        let changes = statement.execute([])?;
        return Ok(QueryOutcome::Done { changes });
    }

    let columns = statement
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    let mut rows = statement.query([])?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..column_count)
            .map(|index| row.get::<_, SqlValue>(index))
            .collect::<Result<Vec<_>, _>>()?;
        collected.push(values);
    }
    Ok(QueryOutcome::Rows {
        columns,
        rows: collected,
    })
}
