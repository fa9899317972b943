//! PostgreSQL executor.
//!
//! Statements reference plugins, tabs, icons and providers by natural
//! identity through sub-selects, so callers never handle surrogate ids.
//! Uniqueness is enforced by the `*_identity` constraints; inserts use
//! `ON CONFLICT DO NOTHING` and report zero rows when a row already exists.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use tally_sdk::Icon;

use super::statement::{
    Operation, PlayerValueRecord, PluginRecord, ProviderRecord, ProviderValue, Record, Statement,
    TabRecord,
};
use super::{Executor, StorageError};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

const UPDATE_ICON: &str = r#"
    UPDATE extension_icon SET name = $1
    WHERE name = $1 AND family = $2 AND color = $3
"#;

const INSERT_ICON: &str = r#"
    INSERT INTO extension_icon (name, family, color)
    VALUES ($1, $2, $3)
    ON CONFLICT DO NOTHING
"#;

// $1 name, $2 server, $3 last_updated, $4..$6 icon
const UPDATE_PLUGIN: &str = r#"
    UPDATE extension_plugin
    SET last_updated = $3,
        icon_id = (SELECT id FROM extension_icon WHERE name = $4 AND family = $5 AND color = $6)
    WHERE name = $1 AND server_uuid = $2
"#;

const INSERT_PLUGIN: &str = r#"
    INSERT INTO extension_plugin (name, server_uuid, last_updated, icon_id)
    VALUES ($1, $2, $3,
        (SELECT id FROM extension_icon WHERE name = $4 AND family = $5 AND color = $6))
    ON CONFLICT DO NOTHING
"#;

// $1 tab name, $2 plugin name, $3 server, $4..$6 icon
const UPDATE_TAB: &str = r#"
    UPDATE extension_tab
    SET icon_id = (SELECT id FROM extension_icon WHERE name = $4 AND family = $5 AND color = $6)
    WHERE name = $1
      AND plugin_id = (SELECT id FROM extension_plugin WHERE name = $2 AND server_uuid = $3)
"#;

const INSERT_TAB: &str = r#"
    INSERT INTO extension_tab (name, plugin_id, icon_id)
    VALUES ($1,
        (SELECT id FROM extension_plugin WHERE name = $2 AND server_uuid = $3),
        (SELECT id FROM extension_icon WHERE name = $4 AND family = $5 AND color = $6))
    ON CONFLICT DO NOTHING
"#;

// $1 text, $2 description, $3 priority, $4 condition, $5 provided condition,
// $6 hidden, $7 kind, $8 tab, $9 plugin, $10 server, $11..$13 icon, $14 name
const UPDATE_PROVIDER: &str = r#"
    UPDATE extension_provider
    SET text = $1,
        description = $2,
        priority = $3,
        condition_name = $4,
        provided_condition = $5,
        hidden = $6,
        value_kind = $7,
        tab_id = (SELECT id FROM extension_tab WHERE name = $8
            AND plugin_id = (SELECT id FROM extension_plugin WHERE name = $9 AND server_uuid = $10)),
        icon_id = (SELECT id FROM extension_icon WHERE name = $11 AND family = $12 AND color = $13)
    WHERE name = $14
      AND plugin_id = (SELECT id FROM extension_plugin WHERE name = $9 AND server_uuid = $10)
"#;

const INSERT_PROVIDER: &str = r#"
    INSERT INTO extension_provider (
        name, text, description, priority, condition_name, provided_condition,
        hidden, value_kind, tab_id, icon_id, plugin_id
    )
    VALUES ($14, $1, $2, $3, $4, $5, $6, $7,
        (SELECT id FROM extension_tab WHERE name = $8
            AND plugin_id = (SELECT id FROM extension_plugin WHERE name = $9 AND server_uuid = $10)),
        (SELECT id FROM extension_icon WHERE name = $11 AND family = $12 AND color = $13),
        (SELECT id FROM extension_plugin WHERE name = $9 AND server_uuid = $10))
    ON CONFLICT DO NOTHING
"#;

// $1 boolean, $2 long, $3 double, $4 percentage, $5 string, $6 player,
// $7 provider, $8 plugin, $9 server
const UPDATE_PLAYER_VALUE: &str = r#"
    UPDATE extension_player_value
    SET boolean_value = $1,
        long_value = $2,
        double_value = $3,
        percentage_value = $4,
        string_value = $5
    WHERE uuid = $6
      AND provider_id = (SELECT id FROM extension_provider WHERE name = $7
          AND plugin_id = (SELECT id FROM extension_plugin WHERE name = $8 AND server_uuid = $9))
"#;

const INSERT_PLAYER_VALUE: &str = r#"
    INSERT INTO extension_player_value (
        boolean_value, long_value, double_value, percentage_value, string_value, uuid, provider_id
    )
    VALUES ($1, $2, $3, $4, $5, $6,
        (SELECT id FROM extension_provider WHERE name = $7
            AND plugin_id = (SELECT id FROM extension_plugin WHERE name = $8 AND server_uuid = $9)))
    ON CONFLICT DO NOTHING
"#;

/// Executor writing to PostgreSQL through a shared pool.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Create an executor on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl std::fmt::Debug for PgExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgExecutor").finish()
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, statement: Statement<'_>) -> Result<u64, StorageError> {
        let update = statement.op == Operation::Update;
        let pick = |update_sql: &'static str, insert_sql: &'static str| {
            if update { update_sql } else { insert_sql }
        };

        let query = match statement.record {
            Record::Icon(icon) => icon_query(pick(UPDATE_ICON, INSERT_ICON), icon),
            Record::Plugin(r) => plugin_query(pick(UPDATE_PLUGIN, INSERT_PLUGIN), r),
            Record::Tab(r) => tab_query(pick(UPDATE_TAB, INSERT_TAB), r),
            Record::Provider(r) => provider_query(pick(UPDATE_PROVIDER, INSERT_PROVIDER), r),
            Record::PlayerValue(r) => {
                player_value_query(pick(UPDATE_PLAYER_VALUE, INSERT_PLAYER_VALUE), r)
            }
        };

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn icon_query<'q>(sql: &'q str, icon: &'q Icon) -> PgQuery<'q> {
    sqlx::query(sql)
        .bind(icon.name.as_str())
        .bind(icon.family.as_str())
        .bind(icon.color.as_str())
}

fn plugin_query<'q>(sql: &'q str, r: PluginRecord<'q>) -> PgQuery<'q> {
    sqlx::query(sql)
        .bind(r.plugin.name.as_str())
        .bind(r.server_uuid)
        .bind(r.last_updated)
        .bind(r.plugin.icon.name.as_str())
        .bind(r.plugin.icon.family.as_str())
        .bind(r.plugin.icon.color.as_str())
}

fn tab_query<'q>(sql: &'q str, r: TabRecord<'q>) -> PgQuery<'q> {
    sqlx::query(sql)
        .bind(r.name)
        .bind(r.plugin_name)
        .bind(r.server_uuid)
        .bind(r.icon.name.as_str())
        .bind(r.icon.family.as_str())
        .bind(r.icon.color.as_str())
}

fn provider_query<'q>(sql: &'q str, r: ProviderRecord<'q>) -> PgQuery<'q> {
    let d = r.definition;
    sqlx::query(sql)
        .bind(d.text.as_str())
        .bind(d.description.as_deref())
        .bind(d.priority)
        .bind(d.condition.as_ref().map(ToString::to_string))
        .bind(d.provided_condition.as_deref())
        .bind(d.hidden)
        .bind(d.kind.as_str())
        .bind(d.tab_name())
        .bind(d.plugin_name.as_str())
        .bind(r.server_uuid)
        .bind(d.icon.name.as_str())
        .bind(d.icon.family.as_str())
        .bind(d.icon.color.as_str())
        .bind(d.method_name.as_str())
}

fn player_value_query<'q>(sql: &'q str, r: PlayerValueRecord<'q>) -> PgQuery<'q> {
    let (boolean, long, double, percentage, string) = value_columns(r.value);
    sqlx::query(sql)
        .bind(boolean)
        .bind(long)
        .bind(double)
        .bind(percentage)
        .bind(string)
        .bind(r.player_uuid)
        .bind(r.method_name)
        .bind(r.plugin_name)
        .bind(r.server_uuid)
}

/// Split a value into its column; the other columns are NULL.
fn value_columns(
    value: &ProviderValue,
) -> (Option<bool>, Option<i64>, Option<f64>, Option<f64>, Option<&str>) {
    match value {
        ProviderValue::Boolean(v) => (Some(*v), None, None, None, None),
        ProviderValue::Number(v) => (None, Some(*v), None, None, None),
        ProviderValue::Double(v) => (None, None, Some(*v), None, None),
        ProviderValue::Percentage(v) => (None, None, None, Some(*v), None),
        ProviderValue::String(v) => (None, None, None, None, Some(v.as_str())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn value_columns_fill_exactly_one() {
        let string = ProviderValue::string("gold");
        let cases = [
            ProviderValue::Boolean(true),
            ProviderValue::Number(4),
            ProviderValue::Double(1.5),
            ProviderValue::Percentage(0.25),
            string,
        ];
        for value in &cases {
            let (b, l, d, p, s) = value_columns(value);
            let filled = [b.is_some(), l.is_some(), d.is_some(), p.is_some(), s.is_some()]
                .iter()
                .filter(|f| **f)
                .count();
            assert_eq!(filled, 1, "{value:?}");
        }
    }

    #[test]
    fn update_and_insert_share_parameter_count() {
        fn max_param(sql: &str) -> u32 {
            (1..=20)
                .filter(|n| sql.contains(&format!("${n}")))
                .max()
                .unwrap_or(0)
        }
        let pairs = [
            (UPDATE_ICON, INSERT_ICON, 3),
            (UPDATE_PLUGIN, INSERT_PLUGIN, 6),
            (UPDATE_TAB, INSERT_TAB, 6),
            (UPDATE_PROVIDER, INSERT_PROVIDER, 14),
            (UPDATE_PLAYER_VALUE, INSERT_PLAYER_VALUE, 9),
        ];
        for (update, insert, expected) in pairs {
            assert_eq!(max_param(update), expected);
            assert_eq!(max_param(insert), expected);
        }
    }

    #[test]
    fn inserts_never_duplicate() {
        for sql in [
            INSERT_ICON,
            INSERT_PLUGIN,
            INSERT_TAB,
            INSERT_PROVIDER,
            INSERT_PLAYER_VALUE,
        ] {
            assert!(sql.contains("ON CONFLICT DO NOTHING"));
        }
    }
}
