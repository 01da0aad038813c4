use crate::models::{CustomFieldMap, FieldValue, IssueSummary, TestDetail, TestStep};

pub const COL_TEST_KEY: &str = "Test Key";
pub const COL_SUMMARY: &str = "Summary";
pub const COL_LABELS: &str = "Labels";
pub const COL_PRECONDITION_TITLES: &str = "Issue Preconditions (keys & titles)";
pub const COL_PRECONDITION_DEFINITIONS: &str = "Issue Preconditions Definition";
pub const COL_STEP_NUMBER: &str = "Step #";
pub const COL_STEP_PRECONDITION: &str = "Step Precondition";
pub const COL_ACTION: &str = "Action";
pub const COL_DATA: &str = "Data";
pub const COL_EXPECTED_RESULT: &str = "Expected Result";

/// 固定列（カスタムフィールド列の前に並ぶ）
pub const FIXED_COLUMNS: [&str; 10] = [
    COL_TEST_KEY,
    COL_SUMMARY,
    COL_LABELS,
    COL_PRECONDITION_TITLES,
    COL_PRECONDITION_DEFINITIONS,
    COL_STEP_NUMBER,
    COL_STEP_PRECONDITION,
    COL_ACTION,
    COL_DATA,
    COL_EXPECTED_RESULT,
];

/// スプレッドシートの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub test_key: String,
    pub summary: String,
    pub labels: String,
    pub precondition_titles: String,
    pub precondition_definitions: String,
    /// 1始まり。ステップのないテストでは None
    pub step_number: Option<usize>,
    pub step_precondition: String,
    pub action: String,
    pub data: String,
    pub expected_result: String,
    /// `CustomFieldMap` の順序に対応する表示値
    pub custom_values: Vec<String>,
}

/// セルの値
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl Cell {
    pub fn text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Blank
        } else {
            Cell::Text(value.to_string())
        }
    }

    /// 列幅計算用の表示文字数
    pub fn display_width(&self) -> usize {
        match self {
            Cell::Text(s) => s.lines().map(|line| line.chars().count()).max().unwrap_or(0),
            Cell::Number(n) => n.to_string().len(),
            Cell::Blank => 0,
        }
    }
}

impl ExportRow {
    pub fn has_step(&self) -> bool {
        self.step_number.is_some()
    }

    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = vec![
            Cell::text(&self.test_key),
            Cell::text(&self.summary),
            Cell::text(&self.labels),
            Cell::text(&self.precondition_titles),
            Cell::text(&self.precondition_definitions),
            self.step_number
                .map(|n| Cell::Number(n as f64))
                .unwrap_or(Cell::Blank),
            Cell::text(&self.step_precondition),
            Cell::text(&self.action),
            Cell::text(&self.data),
            Cell::text(&self.expected_result),
        ];
        cells.extend(self.custom_values.iter().map(|v| Cell::text(v)));
        cells
    }
}

/// エクスポートのヘッダー行
pub fn export_header(custom_fields: &CustomFieldMap) -> Vec<String> {
    FIXED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(custom_fields.column_names().map(str::to_string))
        .collect()
}

/// テスト1件を行に展開する
///
/// ステップごとに1行。ステップがなければステップ列が空の1行を返す。
pub fn flatten(
    summary: &IssueSummary,
    detail: &TestDetail,
    custom_fields: &CustomFieldMap,
) -> Vec<ExportRow> {
    let test_key = if detail.key.is_empty() {
        summary.issue_key.clone()
    } else {
        detail.key.clone()
    };
    let title = if detail.summary.is_empty() {
        summary.summary.clone().unwrap_or_default()
    } else {
        detail.summary.clone()
    };

    let precondition_titles = detail
        .preconditions
        .iter()
        .filter_map(|p| p.title())
        .collect::<Vec<_>>()
        .join("; ");
    let precondition_definitions = detail
        .preconditions
        .iter()
        .filter_map(|p| p.normalized_definition())
        .collect::<Vec<_>>()
        .join(" | ");

    let custom_values: Vec<String> = custom_fields
        .iter()
        .map(|(field_id, _)| FieldValue::from(detail.custom_field(field_id)).to_display())
        .collect();

    let base = ExportRow {
        test_key,
        summary: title,
        labels: detail.labels.join(", "),
        precondition_titles,
        precondition_definitions,
        step_number: None,
        step_precondition: String::new(),
        action: String::new(),
        data: String::new(),
        expected_result: String::new(),
        custom_values,
    };

    if detail.steps.is_empty() {
        return vec![base];
    }

    detail
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| with_step(&base, index + 1, step))
        .collect()
}

fn with_step(base: &ExportRow, number: usize, step: &TestStep) -> ExportRow {
    ExportRow {
        step_number: Some(number),
        step_precondition: step.precondition.clone(),
        action: step.action.clone(),
        data: step.data.clone(),
        expected_result: step.expected_result.clone(),
        ..base.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Precondition;
    use serde_json::json;

    fn detail_with_steps(key: &str, steps: usize) -> TestDetail {
        TestDetail {
            issue_id: "10001".to_string(),
            key: key.to_string(),
            summary: format!("{} summary", key),
            labels: vec!["smoke".to_string(), "regression".to_string()],
            steps: (1..=steps)
                .map(|i| TestStep {
                    id: Some(i.to_string()),
                    action: format!("action {}", i),
                    data: format!("data {}", i),
                    expected_result: format!("result {}", i),
                    precondition: String::new(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_steps_yield_one_blank_row() {
        // Given: ステップのないテスト
        let summary = IssueSummary::new("10001", "TEST-1");
        let detail = detail_with_steps("TEST-1", 0);

        // When: 展開する
        let rows = flatten(&summary, &detail, &CustomFieldMap::default());

        // Then: ステップ列が空の1行
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.test_key, "TEST-1");
        assert!(!row.has_step());
        assert!(row.action.is_empty());
        assert!(row.data.is_empty());
        assert!(row.expected_result.is_empty());
        assert!(row.step_precondition.is_empty());
        assert_eq!(row.cells()[5], Cell::Blank);
    }

    #[test]
    fn test_n_steps_yield_n_rows_with_identical_identity() {
        let summary = IssueSummary::new("10001", "TEST-1");
        let detail = detail_with_steps("TEST-1", 4);

        let rows = flatten(&summary, &detail, &CustomFieldMap::default());

        assert_eq!(rows.len(), 4);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.test_key, "TEST-1");
            assert_eq!(row.summary, "TEST-1 summary");
            assert_eq!(row.labels, "smoke, regression");
            assert_eq!(row.step_number, Some(i + 1));
            assert_eq!(row.action, format!("action {}", i + 1));
            assert_eq!(row.expected_result, format!("result {}", i + 1));
        }
    }

    #[test]
    fn test_custom_fields_follow_map_order() {
        // Given: 2つのカスタムフィールド定義と、片方だけ値を持つテスト
        let fields = CustomFieldMap::new([
            ("customfield_2", "Severity"),
            ("customfield_1", "Components"),
            ("customfield_3", "Missing"),
        ])
        .unwrap();
        let mut detail = detail_with_steps("TEST-1", 1);
        detail
            .custom_fields
            .insert("customfield_1".to_string(), json!([{"value": "A"}, {"value": "B"}]));
        detail
            .custom_fields
            .insert("customfield_2".to_string(), json!({"value": "High"}));
        detail
            .custom_fields
            .insert("customfield_9".to_string(), json!("not exported"));

        // When: 展開する
        let rows = flatten(&IssueSummary::new("10001", "TEST-1"), &detail, &fields);

        // Then: マップ順に表示値が並び、未定義のフィールドは空
        assert_eq!(rows[0].custom_values, vec!["High", "A, B", ""]);
    }

    #[test]
    fn test_preconditions_are_joined() {
        let mut detail = detail_with_steps("TEST-1", 2);
        detail.preconditions = vec![
            Precondition {
                key: Some("TEST-9".to_string()),
                summary: Some("User exists".to_string()),
                definition: Some("Account\n  is active".to_string()),
            },
            Precondition {
                key: Some("TEST-10".to_string()),
                summary: Some("Clean DB".to_string()),
                definition: None,
            },
            Precondition {
                key: None,
                summary: None,
                definition: Some("Logged out".to_string()),
            },
        ];

        let rows = flatten(&IssueSummary::new("10001", "TEST-1"), &detail, &CustomFieldMap::default());

        for row in &rows {
            assert_eq!(row.precondition_titles, "TEST-9 - User exists; TEST-10 - Clean DB");
            assert_eq!(row.precondition_definitions, "Account is active | Logged out");
        }
    }

    #[test]
    fn test_identity_falls_back_to_search_summary() {
        let summary = IssueSummary::new("10001", "TEST-1").with_summary("Search title");
        let detail = TestDetail::default();

        let rows = flatten(&summary, &detail, &CustomFieldMap::default());

        assert_eq!(rows[0].test_key, "TEST-1");
        assert_eq!(rows[0].summary, "Search title");
    }

    #[test]
    fn test_header_and_cells_line_up() {
        let fields = CustomFieldMap::new([("customfield_1", "Severity")]).unwrap();
        let mut detail = detail_with_steps("TEST-1", 1);
        detail
            .custom_fields
            .insert("customfield_1".to_string(), json!({"value": "Low"}));

        let header = export_header(&fields);
        let rows = flatten(&IssueSummary::new("10001", "TEST-1"), &detail, &fields);
        let cells = rows[0].cells();

        assert_eq!(header.len(), cells.len());
        assert_eq!(header[0], COL_TEST_KEY);
        assert_eq!(header[3], COL_PRECONDITION_TITLES);
        assert_eq!(header[5], COL_STEP_NUMBER);
        assert_eq!(header[10], "Severity");
        assert_eq!(cells[5], Cell::Number(1.0));
        assert_eq!(cells[10], Cell::Text("Low".to_string()));
    }

    #[test]
    fn test_display_width() {
        assert_eq!(Cell::text("abc").display_width(), 3);
        assert_eq!(Cell::text("long line\nx").display_width(), 9);
        assert_eq!(Cell::Number(12.0).display_width(), 2);
        assert_eq!(Cell::Blank.display_width(), 0);
    }
}
