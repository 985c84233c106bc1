use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use crate::import::ImportResult;
use powerstat_db::models::{Draw, WHITE_PICK};
use powerstat_engine::cluster::ClusterReport;
use powerstat_engine::features::FeatureVector;
use powerstat_engine::heat::{HeatCategory, HeatReport, HeatTable, NumberStatistic, Temperature};
use powerstat_engine::patterns::{GroupProfile, PatternReport, RecentFrequency};
use powerstat_engine::strategy::Candidate;

pub const DISCLAIMER: &str = "For entertainment and research purposes only. \
Lottery draws are independent random events: no pattern guarantees future results.";

/// Correlated features listed per feature in the strongest correlations section.
const CORRELATION_TOP_N: usize = 3;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "—".to_string(),
    }
}

fn category_color(category: HeatCategory) -> Color {
    match category {
        HeatCategory::BlazingHot => Color::Red,
        HeatCategory::Hot => Color::DarkRed,
        HeatCategory::Warm => Color::Yellow,
        HeatCategory::Neutral => Color::White,
        HeatCategory::Cool => Color::Cyan,
        HeatCategory::Cold => Color::Blue,
        HeatCategory::Freezing => Color::DarkBlue,
    }
}

fn temperature_color(temperature: Temperature) -> Color {
    match temperature {
        Temperature::Hot => Color::Red,
        Temperature::Neutral => Color::White,
        Temperature::Cold => Color::Blue,
    }
}

pub fn display_disclaimer() {
    println!("\n⚠  {DISCLAIMER}");
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("No draws to display.");
        return;
    }

    let mut table = new_table(vec!["Date", "Day", "White balls", "Powerball", "Multiplier"]);
    for draw in draws {
        table.add_row(vec![
            draw.date.format("%Y-%m-%d").to_string(),
            draw.date.format("%a").to_string(),
            join_numbers(&draw.sorted_white_balls()),
            format!("{:2}", draw.powerball),
            draw.multiplier.map_or("—".to_string(), |m| format!("{m}x")),
        ]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import finished:");
    println!("  Records read       : {}", result.total_records);
    println!("  Inserted           : {}", result.inserted);
    println!("  Duplicates skipped : {}", result.skipped);
    if result.errors > 0 {
        println!("  Invalid records    : {}", result.errors);
    }
}

// ════════════════════════════════════════════════════════════════
// Heat
// ════════════════════════════════════════════════════════════════

fn heat_rows(table: &mut Table, stats: &[&NumberStatistic]) {
    for s in stats {
        table.add_row(vec![
            Cell::new(format!("{:2}", s.number)),
            Cell::new(s.observed),
            Cell::new(format!("{:.2}", s.expected)),
            Cell::new(format!("{:+.2}", s.deviation)),
            Cell::new(format!("{:.2}%", s.percentage)),
            Cell::new(format!("{:+.3}", s.z_score)),
            Cell::new(format!("{:.1}", s.heat_index)),
            Cell::new(s.category.to_string()).fg(category_color(s.category)),
        ]);
    }
}

fn display_heat_table(table_data: &HeatTable, top: usize, hot_threshold: f64, cold_threshold: f64) {
    let domain = table_data.domain;
    println!(
        "\n── {} (1-{}) · {} observations over {} draws ──",
        domain,
        domain.size(),
        table_data.total_observations,
        table_data.draw_count
    );

    let header = vec!["Number", "Observed", "Expected", "Deviation", "Share", "Z-score", "Heat", "Category"];
    let mut table = new_table(header);
    let shown: Vec<&NumberStatistic> = table_data.stats().iter().take(top).collect();
    heat_rows(&mut table, &shown);
    println!("{table}");

    let mut counts = new_table(vec!["Category", "Numbers"]);
    for (category, n) in table_data.category_counts() {
        counts.add_row(vec![
            Cell::new(category.to_string()).fg(category_color(category)),
            Cell::new(n),
        ]);
    }
    println!("{counts}");

    let hottest: Vec<u8> = table_data.hottest(hot_threshold).iter().map(|s| s.number).collect();
    let coldest: Vec<u8> = table_data.coldest(cold_threshold).iter().map(|s| s.number).collect();
    println!("Hottest (heat > {hot_threshold}): {}", list_or_none(&hottest));
    println!("Coldest (heat < {cold_threshold}): {}", list_or_none(&coldest));

    let chi = table_data.chi_square();
    println!(
        "Chi-square: χ² = {:.3}, df = {}, p = {:.4} → {}",
        chi.statistic,
        chi.degrees_of_freedom,
        chi.p_value,
        if chi.significant {
            "distribution differs from uniform"
        } else {
            "consistent with a uniform distribution"
        }
    );
}

fn list_or_none(numbers: &[u8]) -> String {
    if numbers.is_empty() {
        "none".to_string()
    } else {
        numbers.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ")
    }
}

pub fn display_heat(report: &HeatReport, top: usize, hot_threshold: f64, cold_threshold: f64) {
    println!("\n🔥 Heat analysis\n");
    display_heat_table(&report.white, top, hot_threshold, cold_threshold);
    display_heat_table(&report.powerball, top, hot_threshold, cold_threshold);
}

// ════════════════════════════════════════════════════════════════
// Features and clusters
// ════════════════════════════════════════════════════════════════

pub fn display_features(features: &[FeatureVector]) {
    if features.is_empty() {
        println!("No features to display.");
        return;
    }

    println!("\n📐 Draw features\n");
    let mut table = new_table(vec![
        "Date", "Sum", "Std", "Range", "E/O", "Consec.", "Gap var.", "Low/High", "Primes", "Fib.", "Days",
        "MA10", "MA50",
    ]);
    for fv in features {
        table.add_row(vec![
            fv.date.format("%Y-%m-%d").to_string(),
            fv.sum.to_string(),
            format!("{:.2}", fv.std),
            fv.range.to_string(),
            format!("{}/{}", fv.even_count, fv.odd_count),
            fv.consecutive_pairs.to_string(),
            format!("{:.1}", fv.gap_variance),
            format!("{:.2}", fv.low_high_ratio),
            fv.prime_count.to_string(),
            fv.fibonacci_count.to_string(),
            fv.days_since_last.to_string(),
            optional(fv.rolling.sum_ma_10, 1),
            optional(fv.rolling.sum_ma_50, 1),
        ]);
    }
    println!("{table}");
}

pub fn display_clusters(report: &ClusterReport) {
    println!("\n🧩 Clustering\n");

    let mut scores = new_table(vec!["k", "Silhouette", "Inertia"]);
    for s in &report.scores {
        let color = if s.k == report.k { Color::Green } else { Color::White };
        scores.add_row(vec![
            Cell::new(s.k).fg(color),
            Cell::new(format!("{:.4}", s.silhouette)).fg(color),
            Cell::new(format!("{:.2}", s.inertia)).fg(color),
        ]);
    }
    println!("{scores}");
    println!("Chosen k = {}", report.k);

    let mut profiles = new_table(vec!["Cluster", "Draws", "Mean sum", "Mean even", "Mean consec.", "Mean primes"]);
    for p in &report.profiles {
        profiles.add_row(vec![
            p.cluster.to_string(),
            p.size.to_string(),
            format!("{:.1}", p.mean_sum),
            format!("{:.2}", p.mean_even),
            format!("{:.2}", p.mean_consecutive),
            format!("{:.2}", p.mean_prime),
        ]);
    }
    println!("{profiles}");
}

// ════════════════════════════════════════════════════════════════
// Patterns
// ════════════════════════════════════════════════════════════════

fn group_row(label: String, g: &GroupProfile) -> Vec<String> {
    vec![
        label,
        g.draws.to_string(),
        format!("{:.1}", g.mean_sum),
        format!("{:.2}", g.mean_even),
        format!("{:.2}", g.mean_consecutive),
    ]
}

fn display_recent(recent: &RecentFrequency, n: usize) {
    let fmt = |pairs: &[(u8, u32)]| {
        pairs
            .iter()
            .map(|(num, c)| format!("{num}({c})"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    println!(
        "Last {} draws, {}: most {} · least {}",
        recent.window,
        recent.domain,
        fmt(recent.hottest(n)),
        fmt(&recent.coldest(n))
    );
}

pub fn display_patterns(report: &PatternReport, top: usize) {
    println!("\n🔎 Patterns over {} draws\n", report.draw_count);

    println!("── Gaps between sorted white balls ──");
    let mut gaps = new_table(vec!["Gap", "Occurrences"]);
    let mut by_count: Vec<(&u8, &u32)> = report.gap_frequency.iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (gap, count) in by_count.into_iter().take(top) {
        gaps.add_row(vec![gap.to_string(), count.to_string()]);
    }
    println!("{gaps}");

    println!("\n── Longest consecutive run per draw ──");
    let mut runs = new_table(vec!["Run length", "Draws"]);
    for (len, count) in &report.run_lengths {
        runs.add_row(vec![len.to_string(), count.to_string()]);
    }
    println!("{runs}");

    println!("\n── Most frequent value per sorted position ──");
    let mut positions = new_table(vec!["Position", "Top values (count)"]);
    for pos in 0..WHITE_PICK {
        let top_values = report
            .positions
            .top(pos, top)
            .iter()
            .map(|(n, c)| format!("{n}({c})"))
            .collect::<Vec<_>>()
            .join(" ");
        positions.add_row(vec![(pos + 1).to_string(), top_values]);
    }
    println!("{positions}");

    println!("\n── By weekday ──");
    let header = vec!["Group", "Draws", "Mean sum", "Mean even", "Mean consec."];
    let mut weekdays = new_table(header.clone());
    for (day, g) in &report.temporal.by_weekday {
        weekdays.add_row(group_row(day.to_string(), g));
    }
    println!("{weekdays}");

    println!("\n── By month ──");
    let mut months = new_table(header.clone());
    for (month, g) in &report.temporal.by_month {
        months.add_row(group_row(format!("{month:02}"), g));
    }
    println!("{months}");

    println!("\n── By year ──");
    let mut years = new_table(header);
    for (year, g) in &report.temporal.by_year {
        years.add_row(group_row(year.to_string(), g));
    }
    println!("{years}");

    println!("\n── Strongest correlations ──");
    for &name in &["sum", "even_count", "powerball"] {
        let pairs = report
            .correlation
            .strongest_with(name, CORRELATION_TOP_N)
            .into_iter()
            .map(|(other, r)| format!("{other} {r:+.3}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {name}: {pairs}");
    }

    println!("\n── Sum bands ──");
    let mut bands = new_table(vec!["Band", "Draws"]);
    for (band, count) in &report.sum_bands.bands {
        bands.add_row(vec![band.to_string(), count.to_string()]);
    }
    if report.sum_bands.outside > 0 {
        bands.add_row(vec!["Outside 50-299".to_string(), report.sum_bands.outside.to_string()]);
    }
    println!("{bands}");

    println!("\n── Even/odd mix ──");
    let mut even_odd = new_table(vec!["Pattern", "Draws"]);
    for (label, count) in &report.even_odd {
        even_odd.add_row(vec![label.clone(), count.to_string()]);
    }
    println!("{even_odd}");

    println!("\n── Recent frequency ──");
    display_recent(&report.recent_white, top);
    display_recent(&report.recent_powerball, top);
}

// ════════════════════════════════════════════════════════════════
// Candidates
// ════════════════════════════════════════════════════════════════

pub fn display_candidates(candidates: &[Candidate]) {
    println!("\n🎲 Candidate sets\n");

    let mut table = new_table(vec!["#", "Strategy", "White balls", "Powerball", "Sum", "E/O", "H/N/C", "PB"]);
    for (i, c) in candidates.iter().enumerate() {
        let s = &c.summary;
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(c.set.strategy.name()),
            Cell::new(join_numbers(&c.set.white_balls)),
            Cell::new(format!("{:2}", c.set.powerball)),
            Cell::new(s.sum),
            Cell::new(format!("{}/{}", s.even_count, WHITE_PICK as u8 - s.even_count)),
            Cell::new(format!("{}/{}/{}", s.hot, s.neutral, s.cold)),
            Cell::new(s.powerball_temperature.to_string()).fg(temperature_color(s.powerball_temperature)),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_numbers() {
        assert_eq!(join_numbers(&[1, 12, 69]), " 1 - 12 - 69");
        assert_eq!(join_numbers(&[]), "");
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional(Some(12.345), 1), "12.3");
        assert_eq!(optional(None, 1), "—");
    }

    #[test]
    fn test_list_or_none() {
        assert_eq!(list_or_none(&[]), "none");
        assert_eq!(list_or_none(&[3, 14]), "3, 14");
    }
}
