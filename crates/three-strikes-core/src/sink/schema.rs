use super::Table;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub mode: &'static str,
}

const fn required(name: &'static str, field_type: &'static str) -> Field {
    Field {
        name,
        field_type,
        mode: "REQUIRED",
    }
}

const fn nullable(name: &'static str, field_type: &'static str) -> Field {
    Field {
        name,
        field_type,
        mode: "NULLABLE",
    }
}

pub fn fields(table: Table) -> Vec<Field> {
    match table {
        Table::AllAccounts => vec![
            required("account_id", "STRING"),
            required("hierarchy", "STRING"),
            required("timestamp", "TIMESTAMP"),
            required("session_id", "STRING"),
        ],
        Table::AdsToRemove => vec![
            required("ad_id", "STRING"),
            required("ad_type", "STRING"),
            required("ad_group_id", "STRING"),
            required("campaign_id", "STRING"),
            required("hierarchy", "STRING"),
            required("final_urls", "STRING"),
            required("policy_topics", "STRING"),
            required("evidences", "STRING"),
            required("mandatory_data", "STRING"),
            required("timestamp", "TIMESTAMP"),
            nullable("removal_status", "STRING"),
            nullable("account_id", "STRING"),
            required("session_id", "STRING"),
            nullable("removal_error", "STRING"),
        ],
        Table::PerAccountSummary => vec![
            required("account_id", "STRING"),
            required("ads_to_remove_count", "INTEGER"),
            required("timestamp", "TIMESTAMP"),
            required("session_id", "STRING"),
        ],
        Table::PerMccSummary => vec![
            required("account_id", "STRING"),
            required("total_sub_accounts", "INTEGER"),
            required("total_ads_to_remove", "INTEGER"),
            required("accounts_with_ads_to_remove", "INTEGER"),
            required("accounts_without_ads_to_remove", "INTEGER"),
            required("timestamp", "TIMESTAMP"),
            required("session_id", "STRING"),
        ],
    }
}

/// BigQuery standard-SQL parameter type for a column.
pub fn parameter_type(table: Table, column: &str) -> &'static str {
    match fields(table).into_iter().find(|f| f.name == column) {
        Some(Field {
            field_type: "INTEGER",
            ..
        }) => "INT64",
        Some(Field {
            field_type: "TIMESTAMP",
            ..
        }) => "TIMESTAMP",
        _ => "STRING",
    }
}
