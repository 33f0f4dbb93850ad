//! Terminal rendering for venues, markers, and events.
//!
//! The detail card renders a single-row venue RecordBatch grouped into
//! sections; list views go through Arrow's pretty printer.

use anyhow::Context;
use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow::util::pretty::pretty_format_batches;
use chrono::{DateTime, NaiveDateTime};
use venuemap_core::{EventRecord, VenueAnnotation, VenueRecord, tables};

/// Columns shown in the venue list table.
const LIST_COLUMNS: &[&str] = &["id", "name", "address", "town", "county", "postcode", "website"];

// ── Card sections ──

const IDENTITY: &[&str] = &["id", "venue_type", "slug", "fsa_id", "is_live"];

const ADDRESS: &[&str] = &[
    "address",
    "address2",
    "town",
    "county",
    "postcode",
    "local_authority",
];

const CONTACT: &[&str] = &["telephone"];

const LOCATION: &[&str] = &["latitude", "longitude", "easting", "northing"];

const TIMESTAMPS: &[&str] = &["created_at", "updated_at"];

/// Print one venue as a vertical card.
pub fn print_venue_card(venue: &VenueRecord, photo_url: Option<&str>) -> anyhow::Result<()> {
    let batch = tables::venues_to_batch(std::slice::from_ref(venue))?;

    println!("=== {} ===", venue.name);
    println!("{}", venue.locality());
    println!();

    print_section(&batch, "Identity", IDENTITY)?;
    print_section(&batch, "Address", ADDRESS)?;
    print_section(&batch, "Contact", CONTACT)?;
    print_section(&batch, "Location", LOCATION)?;
    print_links(venue.website_url().as_deref(), photo_url);
    print_section(&batch, "Timestamps", TIMESTAMPS)?;

    Ok(())
}

fn print_section(batch: &RecordBatch, header: &str, cols: &[&str]) -> anyhow::Result<()> {
    let present: Vec<(&str, &dyn Array)> = cols
        .iter()
        .filter_map(|&name| batch.column_by_name(name).map(|c| (name, c.as_ref())))
        .filter(|(_, col)| !col.is_null(0))
        .collect();
    if present.is_empty() {
        return Ok(());
    }

    println!("{header}");
    let options = FormatOptions::default();
    for (name, col) in present {
        let formatter = ArrayFormatter::try_new(col, &options)
            .with_context(|| format!("formatting column {name}"))?;
        println!("  {:<18} {}", name, formatter.value(0));
    }
    println!();
    Ok(())
}

fn print_links(website: Option<&str>, photo: Option<&str>) {
    let links: Vec<(&str, &str)> = [("website", website), ("photo", photo)]
        .into_iter()
        .filter_map(|(name, url)| url.map(|u| (name, u)))
        .collect();
    if links.is_empty() {
        return;
    }

    println!("Links");
    for (name, url) in links {
        println!("  {:<18} {}", name, url);
    }
    println!();
}

/// Print a page of venues as a table.
pub fn print_venue_table(venues: &[VenueRecord]) -> anyhow::Result<()> {
    let batch = tables::venues_to_batch(venues)?;
    let schema = batch.schema();
    let indices = LIST_COLUMNS
        .iter()
        .map(|name| schema.index_of(name))
        .collect::<Result<Vec<_>, _>>()?;
    let projected = batch.project(&indices)?;
    println!("{}", pretty_format_batches(&[projected])?);
    Ok(())
}

/// Print the marker list for one viewport pass.
pub fn print_annotation_table(
    annotations: &[VenueAnnotation],
    selected: Option<i64>,
) -> anyhow::Result<()> {
    let batch = tables::annotations_to_batch(annotations, selected)?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

/// Print events one per line: start, title, venue.
pub fn print_events(events: &[EventRecord]) {
    for event in events {
        let when = event
            .event_start
            .as_deref()
            .map(format_start)
            .unwrap_or_else(|| "date tba".to_string());
        let venue = event
            .venue
            .as_ref()
            .map(|v| format!("{} ({})", v.name, v.town))
            .unwrap_or_default();
        println!("  {:<22} {:<40} {}", when, event.title, venue);
    }
}

/// Render a stored start timestamp for humans; unparseable values pass through.
fn format_start(raw: &str) -> String {
    const HUMAN: &str = "%a %d %b %Y %H:%M";
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(HUMAN).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format(HUMAN).to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_formats() {
        assert_eq!(format_start("2025-06-10T19:30:00Z"), "Tue 10 Jun 2025 19:30");
        assert_eq!(format_start("2025-06-10T19:30:00"), "Tue 10 Jun 2025 19:30");
        assert_eq!(format_start("2025-06-10 19:30:00"), "Tue 10 Jun 2025 19:30");
        assert_eq!(format_start("next friday"), "next friday");
    }

    #[test]
    fn card_and_tables_render() {
        let mut venue = VenueRecord::new(1, "The Crown").with_position(Some("52.4"), Some("0.26"));
        venue.town = "Ely".into();
        print_venue_card(&venue, Some("https://cdn.example/crown.jpg")).unwrap();
        print_venue_table(std::slice::from_ref(&venue)).unwrap();

        let annotation = VenueAnnotation::from_venue(&venue).unwrap();
        print_annotation_table(&[annotation], Some(1)).unwrap();
    }
}
