use chrono::{Datelike, NaiveDate};
use financial_report_builder::*;
use std::sync::Arc;
use std::thread;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn year_end(year: i32) -> NaiveDate {
    date(year, 12, 31)
}

struct Filing {
    company_id: u32,
    is_annual: bool,
    is_consolidated: bool,
    report_version: u16,
    period_reference: NaiveDate,
}

impl Filing {
    fn annual(year: i32) -> Self {
        Self {
            company_id: 9512,
            is_annual: true,
            is_consolidated: true,
            report_version: 1,
            period_reference: year_end(year),
        }
    }

    fn quarterly(reference: NaiveDate) -> Self {
        Self {
            is_annual: false,
            period_reference: reference,
            ..Self::annual(reference.year())
        }
    }

    fn version(mut self, report_version: u16) -> Self {
        self.report_version = report_version;
        self
    }

    fn balance(&self, code: &str, period_end: NaiveDate, value: f64) -> AccountingEntry {
        self.row(code, None, period_end, value)
    }

    fn flow(&self, code: &str, period_begin: NaiveDate, period_end: NaiveDate, value: f64) -> AccountingEntry {
        self.row(code, Some(period_begin), period_end, value)
    }

    fn row(
        &self,
        code: &str,
        period_begin: Option<NaiveDate>,
        period_end: NaiveDate,
        value: f64,
    ) -> AccountingEntry {
        AccountingEntry {
            company_id: self.company_id,
            fiscal_id: "33.000.167/0001-01".to_string(),
            is_annual: self.is_annual,
            is_consolidated: self.is_consolidated,
            report_version: self.report_version,
            period_reference: self.period_reference,
            period_begin,
            period_end,
            period_order: if period_end == self.period_reference {
                PeriodOrder::Last
            } else {
                PeriodOrder::Previous
            },
            account_code: AccountCode::from(code),
            account_name: format!("Conta {}", code),
            is_fixed_account: true,
            value,
            equity_statement_column: None,
            origin: EntryOrigin::Filed,
        }
    }
}

fn total_assets_history() -> Vec<AccountingEntry> {
    let mut entries = Vec::new();
    for (year, value) in [(2009, 350.419e9), (2015, 900.135e9), (2020, 987.419e9)] {
        let filing = Filing::annual(year);
        entries.push(filing.balance("1", year_end(year), value));
        // comparative column repeats the prior year
        entries.push(filing.balance("1", year_end(year - 1), value * 0.9));
    }
    // restated 2015 filing
    entries.push(Filing::annual(2015).version(2).balance("1", year_end(2015), 900.135e9));
    entries
}

fn ltm_filings() -> Vec<AccountingEntry> {
    let fy22 = Filing::annual(2022);
    let q3_22 = Filing::quarterly(date(2022, 9, 30));
    let q3_23 = Filing::quarterly(date(2023, 9, 30));

    vec![
        fy22.balance("1", year_end(2022), 900.0),
        fy22.flow("3.01", date(2022, 1, 1), year_end(2022), 400.0),
        fy22.flow("6.01", date(2022, 1, 1), year_end(2022), 120.0),
        q3_22.balance("1", date(2022, 9, 30), 850.0),
        q3_22.flow("3.01", date(2022, 1, 1), date(2022, 9, 30), 290.0),
        q3_22.flow("6.01", date(2022, 1, 1), date(2022, 9, 30), 80.0),
        q3_23.balance("1", date(2023, 9, 30), 1000.0),
        q3_23.flow("3.01", date(2023, 1, 1), date(2023, 9, 30), 330.0),
        q3_23.flow("3.01", date(2022, 1, 1), date(2022, 9, 30), 290.0),
        // quarter-only column of the same filing
        q3_23.flow("3.01", date(2023, 7, 1), date(2023, 9, 30), 115.0),
        q3_23.flow("6.01", date(2023, 1, 1), date(2023, 9, 30), 95.0),
        q3_23.flow("6.01", date(2022, 1, 1), date(2022, 9, 30), 80.0),
    ]
}

#[test]
fn test_total_assets_in_billions() {
    let dataset = Dataset::from_entries(total_assets_history());
    let request = ReportRequest::new(StatementFamily::Assets).with_unit_divisor(1e9);
    let report = dataset.build_report(9512, true, &request).unwrap();

    for (year, expected) in [(2009, 350.419), (2015, 900.135), (2020, 987.419)] {
        let value = report
            .value_at("1", year_end(year))
            .and_then(|cell| cell.as_f64())
            .unwrap();
        assert_eq!(round_to(value, 3), expected, "total assets {}", year);
    }
}

#[test]
fn test_ltm_columns_through_dataset() {
    let dataset = Dataset::from_entries(ltm_filings());

    let income = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Income))
        .unwrap();
    assert_eq!(income.column_labels(), vec!["2022-12-31", "2023-09-30 (ltm)"]);
    assert_eq!(income.value("3.01", "2023-09-30 (ltm)"), Some(Cell::Value(440.0)));
    assert_eq!(income.value("3.01", "2022-12-31"), Some(Cell::Value(400.0)));

    let cash_flow = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::CashFlow))
        .unwrap();
    assert_eq!(cash_flow.value("6.01", "2023-09-30 (ltm)"), Some(Cell::Value(135.0)));

    // balances at the quarter are point-in-time figures
    let assets = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Assets))
        .unwrap();
    assert_eq!(assets.column_labels(), vec!["2022-12-31", "2023-09-30"]);

    let summary = dataset.summary();
    assert_eq!(summary.pipeline.ltm_rows, 2);
    assert!(summary.pipeline.omitted_ltm_accounts.is_empty());
}

#[test]
fn test_newer_annual_leaves_flows_untouched() {
    let mut entries = ltm_filings();
    let fy23 = Filing::annual(2023);
    entries.push(fy23.flow("3.01", date(2023, 1, 1), year_end(2023), 450.0));
    entries.push(fy23.balance("1", year_end(2023), 1100.0));

    let dataset = Dataset::from_entries(entries);
    let income = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Income))
        .unwrap();

    assert_eq!(income.column_labels(), vec!["2022-12-31", "2023-12-31"]);
    assert_eq!(income.value("3.01", "2023-12-31"), Some(Cell::Value(450.0)));
    assert_eq!(dataset.summary().pipeline.ltm_rows, 0);
}

#[test]
fn test_depth_round_trip() {
    let fy = Filing::annual(2022);
    let entries = vec![
        fy.balance("1", year_end(2022), 1000.0),
        fy.balance("1.01", year_end(2022), 400.0),
        fy.balance("1.01.01", year_end(2022), 50.0),
        fy.balance("1.01.01.01", year_end(2022), 20.0),
        fy.balance("1.02", year_end(2022), 600.0),
    ];
    let dataset = Dataset::from_entries(entries);

    let full = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Assets))
        .unwrap();
    let direct = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Assets).with_depth(2))
        .unwrap();

    assert_eq!(full.filter_depth(2).unwrap(), direct);
    assert_eq!(direct.rows.len(), 3);
}

#[test]
fn test_request_errors() {
    let dataset = Dataset::from_entries(total_assets_history());

    let err = dataset
        .build_report(1234, true, &ReportRequest::new(StatementFamily::Assets))
        .unwrap_err();
    assert!(matches!(
        err,
        FinancialReportError::NotFound { company_id: 1234, method: AccountingMethod::Consolidated }
    ));

    let err = dataset
        .build_report(9512, false, &ReportRequest::new(StatementFamily::Assets))
        .unwrap_err();
    assert!(err.to_string().contains("separate"));

    let err = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Assets).with_unit_divisor(0.0))
        .unwrap_err();
    assert!(matches!(err, FinancialReportError::InvalidArgument { field: "unit_divisor", .. }));

    let err = dataset.build_indicators(9512, true, 1.2).unwrap_err();
    assert!(matches!(err, FinancialReportError::InvalidArgument { field: "tax_rate", .. }));

    assert!("balance_sheet".parse::<StatementFamily>().is_err());
}

fn indicator_filings() -> Vec<AccountingEntry> {
    let mut entries = Vec::new();
    let rows: [(&str, f64, f64); 11] = [
        ("1", 1000.0, 1100.0),
        ("1.01", 300.0, 350.0),
        ("1.01.01", 80.0, 90.0),
        ("1.01.02", 20.0, 30.0),
        ("2.01", 200.0, 220.0),
        ("2.01.04", 50.0, 60.0),
        ("2.02.01", 250.0, 240.0),
        ("2.03", 400.0, 450.0),
        ("3.01", 800.0, 0.0),
        ("3.05", 150.0, 197.82),
        ("3.11", 90.0, 120.0),
    ];
    for (year, pick) in [(2020, 0), (2021, 1)] {
        let filing = Filing::annual(year);
        for (code, first, second) in rows {
            let value = if pick == 0 { first } else { second };
            if code.starts_with('3') {
                entries.push(filing.flow(code, date(year, 1, 1), year_end(year), value));
            } else {
                entries.push(filing.balance(code, year_end(year), value));
            }
        }
    }
    entries
}

#[test]
fn test_indicators_from_dataset() {
    let dataset = Dataset::from_entries(indicator_filings());
    let indicators = dataset.build_indicators(9512, true, 0.34).unwrap();

    let roic = indicators
        .value("return_on_capital", "2021-12-31")
        .and_then(|cell| cell.as_f64())
        .unwrap();
    assert!((roic - 0.2176).abs() < 1e-4);

    let invested = indicators
        .value("invested_capital", "2020-12-31")
        .and_then(|cell| cell.as_f64())
        .unwrap();
    assert!((invested - 600.0).abs() < 1e-9);

    // no gross profit account, no cash flow statement
    assert_eq!(indicators.value("gross_margin", "2021-12-31"), Some(Cell::Missing));
    assert_eq!(indicators.value("operating_cash_flow", "2020-12-31"), Some(Cell::Missing));
    // revenues of zero
    assert_eq!(indicators.value("net_margin", "2021-12-31"), Some(Cell::Unavailable));
    let net_margin = indicators
        .value("net_margin", "2020-12-31")
        .and_then(|cell| cell.as_f64())
        .unwrap();
    assert!((net_margin - 90.0 / 800.0).abs() < 1e-12);
}

#[test]
fn test_indicator_ratios_ignore_units() {
    let dataset = Dataset::from_entries(indicator_filings());
    let options = IndicatorOptions {
        unit_divisor: 1_000.0,
        num_years: 1,
        ..Default::default()
    };
    let indicators = dataset.build_indicators_with(9512, true, &options).unwrap();

    assert_eq!(indicators.column_labels(), vec!["2021-12-31"]);
    let roic = indicators.rows.iter().find(|r| r.key == "return_on_capital").unwrap().cells[0];
    assert!((roic.as_f64().unwrap() - 0.2176).abs() < 1e-4);
    let ebit = indicators.value("ebit", "2021-12-31").unwrap().as_f64().unwrap();
    assert!((ebit - 0.19782).abs() < 1e-12);
}

fn ltm_indicator_filings() -> Vec<AccountingEntry> {
    let fy22 = Filing::annual(2022);
    let q3_23 = Filing::quarterly(date(2023, 9, 30));

    let mut entries = Vec::new();
    for (code, annual, quarter) in [
        ("1", 1000.0, 1100.0),
        ("1.01.01", 80.0, 90.0),
        ("1.01.02", 20.0, 30.0),
        ("2.01.04", 50.0, 60.0),
        ("2.02.01", 250.0, 240.0),
        ("2.03", 400.0, 450.0),
    ] {
        entries.push(fy22.balance(code, year_end(2022), annual));
        entries.push(q3_23.balance(code, date(2023, 9, 30), quarter));
    }
    entries.extend([
        fy22.flow("3.01", date(2022, 1, 1), year_end(2022), 800.0),
        fy22.flow("3.05", date(2022, 1, 1), year_end(2022), 150.0),
        fy22.flow("3.11", date(2022, 1, 1), year_end(2022), 90.0),
        q3_23.flow("3.01", date(2023, 1, 1), date(2023, 9, 30), 630.0),
        q3_23.flow("3.01", date(2022, 1, 1), date(2022, 9, 30), 590.0),
        q3_23.flow("3.11", date(2023, 1, 1), date(2023, 9, 30), 100.0),
        q3_23.flow("3.11", date(2022, 1, 1), date(2022, 9, 30), 70.0),
        // no comparative column for EBIT
        q3_23.flow("3.05", date(2023, 1, 1), date(2023, 9, 30), 120.0),
    ]);
    entries
}

#[test]
fn test_indicators_over_ltm_column() {
    let dataset = Dataset::from_entries(ltm_indicator_filings());
    let omitted = dataset.summary().pipeline.omitted_ltm_accounts;
    assert_eq!(omitted.len(), 1);
    assert_eq!(omitted[0].account_code.as_str(), "3.05");

    let indicators = dataset.build_indicators(9512, true, 0.34).unwrap();
    assert_eq!(indicators.column_labels(), vec!["2022-12-31", "2023-09-30 (ltm)"]);

    let ltm = |key: &str| indicators.value(key, "2023-09-30 (ltm)").unwrap();
    assert_eq!(ltm("revenues"), Cell::Value(840.0));
    assert_eq!(ltm("net_income"), Cell::Value(120.0));

    // EBIT has no LTM figure, so nothing built on it reads as zero
    for key in ["ebit", "ebitda", "return_on_assets", "return_on_capital", "operating_margin"] {
        assert_eq!(ltm(key), Cell::Missing, "{}", key);
    }

    // quarter balances are current figures, the annual close is the prior one
    let roe = ltm("return_on_equity").as_f64().unwrap();
    assert!((roe - 120.0 / 400.0).abs() < 1e-12);
    let invested = ltm("invested_capital").as_f64().unwrap();
    assert!((invested - 630.0).abs() < 1e-9);

    let roa = indicators
        .value("return_on_assets", "2022-12-31")
        .and_then(|cell| cell.as_f64())
        .unwrap();
    assert!((roa - 150.0 * 0.66 / 1000.0).abs() < 1e-12);

    // the public report keeps zero-filling the omitted account
    let income = dataset
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Income))
        .unwrap();
    assert_eq!(income.value("3.05", "2023-09-30 (ltm)"), Some(Cell::Value(0.0)));
}

#[test]
fn test_raw_rows_to_report() -> anyhow::Result<()> {
    let raw = |code: &str, name: &str, value: f64| RawStatementRow {
        company_id: 9512,
        fiscal_id: "33.000.167/0001-01".to_string(),
        filing_kind: "DFP".to_string(),
        report_version: 1,
        period_reference: "2020-12-31".to_string(),
        period_begin: Some("2020-01-01".to_string()),
        period_end: "2020-12-31".to_string(),
        period_order: "ÚLTIMO".to_string(),
        statement_group: "DF Consolidado - Demonstração do Resultado".to_string(),
        account_code: code.to_string(),
        account_name: name.to_string(),
        fixed_account_flag: "S".to_string(),
        currency_scale: "MIL".to_string(),
        value,
        equity_statement_column: None,
    };

    let entries = normalize_raw_rows(&[
        raw("3.01", "Receita de Venda de Bens e/ou Serviços", 272_069_000.0),
        raw("3.99.01.01", "On", 0.54),
    ])?;
    let dataset = Dataset::from_entries(entries);

    let request = ReportRequest::new(StatementFamily::Income).with_unit_divisor(parse_unit("billion")?);
    let report = dataset.build_report(9512, true, &request)?;

    assert_eq!(report.value("3.01", "2020-12-31"), Some(Cell::Value(272.069)));
    assert_eq!(report.value("3.99.01.01", "2020-12-31"), Some(Cell::Value(0.54)));
    assert_eq!(report.row("3.99.01.01").and_then(|r| r.label.as_deref()), Some("ON"));

    Ok(())
}

#[test]
fn test_json_contract_and_translation() -> anyhow::Result<()> {
    let schema = AccountingEntry::schema_as_json()?;
    assert!(schema.contains("equity_statement_column"));

    let json = serde_json::to_string(&total_assets_history())?;
    let dataset = Dataset::from_json_reader(json.as_bytes())?;
    assert_eq!(dataset.resolve_company("33.000.167/0001-01")?, 9512);

    let report = dataset.build_report(9512, true, &ReportRequest::new(StatementFamily::Assets))?;
    let translator = AccountNameTranslator::from_json_str(r#"{"Conta 1": "Total Assets"}"#)?;
    let translated = report.translate_labels(&translator);
    assert_eq!(translated.rows[0].label.as_deref(), Some("Total Assets"));

    let untranslated = report.translate_labels(&AccountNameTranslator::new());
    assert_eq!(
        untranslated.rows[0].label.as_deref(),
        Some("Conta 1 [untranslated]")
    );

    let rendered: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
    assert_eq!(rendered["columns"][0]["period_end"], "2008-12-31");

    Ok(())
}

#[test]
fn test_concurrent_reads_during_refresh() {
    let handle = Arc::new(DatasetHandle::new(Dataset::from_entries(ltm_filings())));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let snapshot = handle.snapshot();
            thread::spawn(move || {
                snapshot
                    .build_report(9512, true, &ReportRequest::new(StatementFamily::Income))
                    .map(|report| report.value("3.01", "2023-09-30 (ltm)"))
            })
        })
        .collect();

    let previous = handle.refresh(Dataset::from_entries(total_assets_history()));
    assert_eq!(previous.summary().pipeline.ltm_rows, 2);

    for reader in readers {
        assert_eq!(reader.join().unwrap().unwrap(), Some(Cell::Value(440.0)));
    }
    assert!(handle
        .snapshot()
        .build_report(9512, true, &ReportRequest::new(StatementFamily::Income))
        .unwrap()
        .is_empty());
}
