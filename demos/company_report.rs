use financial_report_builder::{
    normalize_raw_rows, parse_unit, AccountNameTranslator, Dataset, RawStatementRow,
    ReportRequest, StatementFamily,
};

fn raw(
    filing_kind: &str,
    reference: &str,
    begin: Option<&str>,
    end: &str,
    group: &str,
    code: &str,
    name: &str,
    value: f64,
) -> RawStatementRow {
    RawStatementRow {
        company_id: 9512,
        fiscal_id: "33.000.167/0001-01".to_string(),
        filing_kind: filing_kind.to_string(),
        report_version: 1,
        period_reference: reference.to_string(),
        period_begin: begin.map(str::to_string),
        period_end: end.to_string(),
        period_order: if reference == end { "ÚLTIMO" } else { "PENÚLTIMO" }.to_string(),
        statement_group: format!("DF Consolidado - {}", group),
        account_code: code.to_string(),
        account_name: name.to_string(),
        fixed_account_flag: "S".to_string(),
        currency_scale: "MIL".to_string(),
        value,
        equity_statement_column: None,
    }
}

fn main() {
    let assets = "Balanço Patrimonial Ativo";
    let liabilities = "Balanço Patrimonial Passivo";
    let income = "Demonstração do Resultado";

    let rows = vec![
        raw("DFP", "2022-12-31", None, "2022-12-31", assets, "1", "Ativo Total", 1_000_000.0),
        raw("DFP", "2022-12-31", None, "2022-12-31", assets, "1.01.01", "Caixa e Equivalentes de Caixa", 80_000.0),
        raw("DFP", "2022-12-31", None, "2022-12-31", liabilities, "2.01.04", "Empréstimos e Financiamentos", 50_000.0),
        raw("DFP", "2022-12-31", None, "2022-12-31", liabilities, "2.02.01", "Empréstimos e Financiamentos", 250_000.0),
        raw("DFP", "2022-12-31", None, "2022-12-31", liabilities, "2.03", "Patrimônio Líquido Consolidado", 400_000.0),
        raw("DFP", "2022-12-31", Some("2022-01-01"), "2022-12-31", income, "3.01", "Receita de Venda de Bens e/ou Serviços", 800_000.0),
        raw("DFP", "2022-12-31", Some("2022-01-01"), "2022-12-31", income, "3.05", "Resultado Antes do Resultado Financeiro e dos Tributos", 150_000.0),
        raw("ITR", "2023-09-30", None, "2023-09-30", assets, "1", "Ativo Total", 1_050_000.0),
        raw("ITR", "2023-09-30", None, "2023-09-30", liabilities, "2.03", "Patrimônio Líquido Consolidado", 420_000.0),
        raw("ITR", "2023-09-30", Some("2023-01-01"), "2023-09-30", income, "3.01", "Receita de Venda de Bens e/ou Serviços", 630_000.0),
        raw("ITR", "2023-09-30", Some("2022-01-01"), "2022-09-30", income, "3.01", "Receita de Venda de Bens e/ou Serviços", 590_000.0),
        raw("ITR", "2023-09-30", Some("2023-01-01"), "2023-09-30", income, "3.05", "Resultado Antes do Resultado Financeiro e dos Tributos", 120_000.0),
        raw("ITR", "2023-09-30", Some("2022-01-01"), "2022-09-30", income, "3.05", "Resultado Antes do Resultado Financeiro e dos Tributos", 110_000.0),
    ];

    let entries = normalize_raw_rows(&rows).expect("raw rows should use known codes");
    let dataset = Dataset::from_entries(entries);

    let summary = dataset.summary();
    println!(
        "Loaded {} entries from {} reports ({} LTM rows)",
        summary.accounting_entries, summary.number_of_reports, summary.pipeline.ltm_rows
    );

    let translator = AccountNameTranslator::from_pairs([
        ("Ativo Total", "Total Assets"),
        ("Receita de Venda de Bens e/ou Serviços", "Revenues"),
        ("Patrimônio Líquido Consolidado", "Consolidated Equity"),
    ]);

    let request = ReportRequest::new(StatementFamily::Income)
        .with_unit_divisor(parse_unit("million").expect("known unit"));
    let report = dataset
        .build_report(9512, true, &request)
        .expect("company 9512 is loaded")
        .translate_labels(&translator);

    println!("\nIncome statement (BRL million)");
    println!("{:<10} {:<60} {}", "code", "account", report.column_labels().join("  "));
    for row in &report.rows {
        let cells: Vec<String> = row.cells.iter().map(|c| format!("{:>10}", c.to_string())).collect();
        println!(
            "{:<10} {:<60} {}",
            row.key,
            row.label.as_deref().unwrap_or(""),
            cells.join("  ")
        );
    }

    let indicators = dataset
        .build_indicators(9512, true, 0.34)
        .expect("indicators for company 9512");

    println!("\nIndicators");
    for row in &indicators.rows {
        let cells: Vec<String> = row.cells.iter().map(|c| format!("{:>12}", c.to_string())).collect();
        println!("{:<22} {}", row.key, cells.join("  "));
    }

    let info = dataset.company_info(9512, true).expect("company 9512 is loaded");
    println!(
        "\nLast annual close {:?}, last quarter {:?}",
        info.last_annual, info.last_quarter
    );
}
