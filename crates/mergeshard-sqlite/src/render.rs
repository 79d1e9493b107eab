//! Rendering of [`DdlStatement`]s as SQLite SQL.

use mergeshard_error::{Result, ShardError};
use mergeshard_types::{DdlStatement, Dialect};

const D: Dialect = Dialect::SqliteView;

/// Rewrite the stored `CREATE TABLE` text of a template into a conditional
/// create of `table` with the same column list and table options.
///
/// Only the table definition is copied; indexes and triggers on the template
/// are not.
pub fn clone_definition(template_sql: &str, table: &str) -> Result<String> {
    let columns = column_list_start(template_sql).ok_or_else(|| {
        ShardError::ddl(
            format!("clone partition {table}"),
            "template definition has no column list",
        )
    })?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS main.{} {}",
        D.quote_ident(table)?,
        &template_sql[columns..]
    ))
}

/// Byte offset of the `(` opening the column list, past the (possibly
/// quoted or schema-qualified) table name.
fn column_list_start(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut pos = skip_keyword(sql, 0, "CREATE")?;
    if let Some(after) =
        skip_keyword(sql, pos, "TEMP").or_else(|| skip_keyword(sql, pos, "TEMPORARY"))
    {
        pos = after;
    }
    pos = skip_keyword(sql, pos, "TABLE")?;
    if let Some(after) = skip_keyword(sql, pos, "IF")
        .and_then(|p| skip_keyword(sql, p, "NOT"))
        .and_then(|p| skip_keyword(sql, p, "EXISTS"))
    {
        pos = after;
    }
    loop {
        pos = skip_name(bytes, skip_space(bytes, pos))?;
        pos = skip_space(bytes, pos);
        match bytes.get(pos)? {
            b'.' => pos += 1,
            b'(' => return Some(pos),
            _ => return None,
        }
    }
}

fn skip_space(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        pos += 1;
    }
    pos
}

fn skip_keyword(sql: &str, pos: usize, keyword: &str) -> Option<usize> {
    let start = skip_space(sql.as_bytes(), pos);
    let end = start + keyword.len();
    if !sql.get(start..end)?.eq_ignore_ascii_case(keyword) {
        return None;
    }
    match sql.as_bytes().get(end) {
        Some(b) if b.is_ascii_alphanumeric() || *b == b'_' => None,
        _ => Some(end),
    }
}

/// End of the identifier starting at `pos`. Quoted forms double their
/// closing quote to escape it; `[...]` has no escape.
fn skip_name(bytes: &[u8], pos: usize) -> Option<usize> {
    let close = match *bytes.get(pos)? {
        b'"' => b'"',
        b'`' => b'`',
        b'\'' => b'\'',
        b'[' => b']',
        _ => {
            let mut end = pos;
            while bytes
                .get(end)
                .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(*b, b'(' | b'.'))
            {
                end += 1;
            }
            return (end > pos).then_some(end);
        }
    };
    let mut i = pos + 1;
    while let Some(&b) = bytes.get(i) {
        if b == close {
            if close != b']' && bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// Escape `%`, `_` and `\` so `prefix` matches literally in
/// `LIKE ... ESCAPE '\'`.
pub fn escape_like(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 4);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Render `stmt` as SQLite statements, in execution order.
///
/// `template_sql` is the stored definition of the template and is required
/// for [`DdlStatement::ClonePartition`]; `None` there means the template does
/// not exist. Renames are rejected: SQLite cannot rename views.
pub fn render_sqlite(stmt: &DdlStatement, template_sql: Option<&str>) -> Result<Vec<String>> {
    let sql = match stmt {
        DdlStatement::ClonePartition { table, template } => {
            let Some(template_sql) = template_sql else {
                return Err(ShardError::ddl(
                    stmt.to_string(),
                    format!("no such table: {template}"),
                ));
            };
            clone_definition(template_sql, table)?
        }
        DdlStatement::CreateUnion {
            table,
            template,
            members,
            temporary,
        } => {
            let body = if members.is_empty() {
                format!("SELECT * FROM {} WHERE 0", D.quote_ident(template)?)
            } else {
                members
                    .iter()
                    .map(|m| Ok(format!("SELECT * FROM {}", D.quote_ident(m)?)))
                    .collect::<Result<Vec<_>>>()?
                    .join(" UNION ALL ")
            };
            let (kw, schema) = if *temporary {
                ("TEMP ", "temp")
            } else {
                ("", "main")
            };
            format!(
                "CREATE {kw}VIEW {schema}.{} AS {body}",
                D.quote_ident(table)?
            )
        }
        DdlStatement::DropUnion { table, temporary } => {
            let schema = if *temporary { "temp" } else { "main" };
            format!("DROP VIEW IF EXISTS {schema}.{}", D.quote_ident(table)?)
        }
        DdlStatement::RenameUnions { .. } => {
            return Err(ShardError::ddl(
                stmt.to_string(),
                "sqlite cannot rename views",
            ));
        }
    };
    Ok(vec![sql])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_keeps_columns_and_options() {
        let sql = clone_definition(
            "CREATE TABLE report_model (id INTEGER PRIMARY KEY, amount REAL) STRICT",
            "report_1",
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS main.\"report_1\" (id INTEGER PRIMARY KEY, amount REAL) STRICT"
        );
    }

    #[test]
    fn clone_without_column_list_fails() {
        assert!(clone_definition("CREATE TABLE t AS SELECT 1", "x").is_err());
    }

    #[test]
    fn clone_skips_quoted_template_names() {
        for template in [
            "CREATE TABLE \"odd(name\" (id INTEGER)",
            "CREATE TABLE \"say \"\"(hi\"\"\" (id INTEGER)",
            "CREATE TABLE [a (b] (id INTEGER)",
            "CREATE TABLE `x(` (id INTEGER)",
            "create temp table if not exists main.\"t(\" (id INTEGER)",
            "CREATE TABLE t(id INTEGER)",
        ] {
            let sql = clone_definition(template, "p").unwrap();
            assert!(sql.ends_with("main.\"p\" (id INTEGER)"), "{template} -> {sql}");
        }
    }

    #[test]
    fn clone_rejects_unterminated_name() {
        assert!(clone_definition("CREATE TABLE \"t(id INTEGER)", "p").is_err());
    }

    #[test]
    fn union_view_over_members() {
        let sql = render_sqlite(
            &DdlStatement::CreateUnion {
                table: "report".to_owned(),
                template: "report_model".to_owned(),
                members: vec!["report_1".to_owned(), "report_2".to_owned()],
                temporary: false,
            },
            None,
        )
        .unwrap();
        assert_eq!(
            sql,
            ["CREATE VIEW main.\"report\" AS SELECT * FROM \"report_1\" UNION ALL SELECT * FROM \"report_2\""]
        );
    }

    #[test]
    fn empty_union_selects_nothing_from_template() {
        let sql = render_sqlite(
            &DdlStatement::CreateUnion {
                table: "report".to_owned(),
                template: "report_model".to_owned(),
                members: Vec::new(),
                temporary: false,
            },
            None,
        )
        .unwrap();
        assert_eq!(
            sql,
            ["CREATE VIEW main.\"report\" AS SELECT * FROM \"report_model\" WHERE 0"]
        );
    }

    #[test]
    fn temporary_union_and_drop() {
        let create = render_sqlite(
            &DdlStatement::CreateUnion {
                table: "report1t2n3".to_owned(),
                template: "report_model".to_owned(),
                members: vec!["report_1".to_owned()],
                temporary: true,
            },
            None,
        )
        .unwrap();
        assert!(create[0].starts_with("CREATE TEMP VIEW temp.\"report1t2n3\" AS"));

        let drop = render_sqlite(
            &DdlStatement::DropUnion {
                table: "report".to_owned(),
                temporary: false,
            },
            None,
        )
        .unwrap();
        assert_eq!(drop, ["DROP VIEW IF EXISTS main.\"report\""]);
    }

    #[test]
    fn clone_without_template_is_ddl_error() {
        let err = render_sqlite(
            &DdlStatement::ClonePartition {
                table: "report_1".to_owned(),
                template: "report_model".to_owned(),
            },
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no such table: report_model"));
    }

    #[test]
    fn rename_is_rejected() {
        let err = render_sqlite(
            &DdlStatement::RenameUnions {
                renames: vec![("a".to_owned(), "b".to_owned())],
            },
            None,
        )
        .unwrap_err();
        assert!(err.is_backend_failure());
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("report_"), "report\\_");
        assert_eq!(escape_like("a%b\\c"), "a\\%b\\\\c");
    }
}
