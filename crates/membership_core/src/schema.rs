//! Admin export of the store's table definitions.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::ColumnInfo;
use crate::error::ServiceResult;
use crate::ports::DatabaseService;
use crate::session::SessionContext;

/// Renders one `CREATE TABLE` statement per table, tables sorted by name and
/// columns in the order the store reported them.
pub fn render_schema(columns: &[ColumnInfo]) -> String {
    let mut tables: BTreeMap<&str, Vec<&ColumnInfo>> = BTreeMap::new();
    for column in columns {
        tables.entry(column.table.as_str()).or_default().push(column);
    }
    let mut out = String::new();
    for (table, columns) in tables {
        out.push_str(&format!("CREATE TABLE public.{} (\n", table));
        let lines: Vec<String> = columns
            .iter()
            .map(|c| {
                let mut line = format!("  {} {}", c.column, c.data_type);
                if !c.nullable {
                    line.push_str(" NOT NULL");
                }
                if let Some(default) = &c.default {
                    line.push_str(&format!(" DEFAULT {}", default));
                }
                line
            })
            .collect();
        out.push_str(&lines.join(",\n"));
        out.push_str("\n);\n\n");
    }
    out
}

#[derive(Clone)]
pub struct SchemaService {
    db: Arc<dyn DatabaseService>,
}

impl SchemaService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn export(&self, ctx: &SessionContext) -> ServiceResult<String> {
        let admin_id = ctx.require_admin()?;
        let columns = self.db.describe_schema().await?;
        info!(%admin_id, columns = columns.len(), "schema exported");
        Ok(render_schema(&columns))
    }
}
