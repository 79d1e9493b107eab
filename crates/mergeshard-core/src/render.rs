//! Rendering of [`DdlStatement`]s as MySQL `MERGE`-engine SQL.
//!
//! A union is built the way the engine requires: first a plain table with the
//! template's definition, then an `ALTER` switching it to `ENGINE=MERGE` over
//! the member tables. `INSERT_METHOD=NO` makes the result reject writes.

use mergeshard_error::Result;
use mergeshard_types::{DdlStatement, Dialect};

const D: Dialect = Dialect::MySqlMerge;

/// Render `stmt` as one or more MySQL statements, in execution order.
pub fn render_mysql(stmt: &DdlStatement) -> Result<Vec<String>> {
    let sql = match stmt {
        DdlStatement::ClonePartition { table, template } => vec![format!(
            "CREATE TABLE IF NOT EXISTS {} LIKE {}",
            D.quote_ident(table)?,
            D.quote_ident(template)?
        )],
        DdlStatement::CreateUnion {
            table,
            template,
            members,
            temporary,
        } => {
            let table = D.quote_ident(table)?;
            vec![
                format!(
                    "CREATE {}TABLE {table} LIKE {}",
                    temporary_kw(*temporary),
                    D.quote_ident(template)?
                ),
                format!(
                    "ALTER TABLE {table} ENGINE=MERGE UNION=({}) INSERT_METHOD=NO",
                    D.quote_list(members)?
                ),
            ]
        }
        DdlStatement::DropUnion { table, temporary } => vec![format!(
            "DROP {}TABLE IF EXISTS {}",
            temporary_kw(*temporary),
            D.quote_ident(table)?
        )],
        DdlStatement::RenameUnions { renames } => {
            if renames.is_empty() {
                return Ok(Vec::new());
            }
            let pairs = renames
                .iter()
                .map(|(from, to)| Ok(format!("{} TO {}", D.quote_ident(from)?, D.quote_ident(to)?)))
                .collect::<Result<Vec<_>>>()?;
            vec![format!("RENAME TABLE {}", pairs.join(", "))]
        }
    };
    Ok(sql)
}

const fn temporary_kw(temporary: bool) -> &'static str {
    if temporary { "TEMPORARY " } else { "" }
}
