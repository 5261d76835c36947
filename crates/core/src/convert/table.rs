//! Table structure construction
//!
//! Builds the three-layer persistence plan for one table: shell dimensions,
//! allocated column widths, and the per-cell content blocks in row-major
//! order (header row first). The width allocation must sum exactly to the
//! caller's budget; the platform rejects shells whose column widths do not
//! add up.

use larkdown_domain::constants::{MAX_COLUMN_FRACTION, MIN_COLUMN_WIDTH};
use larkdown_domain::{Block, TableStructure, TextElement};

use super::width::display_weight;

/// Estimated horizontal pixels per unit of display weight.
const PIXELS_PER_WEIGHT: u32 = 8;

/// Rows of cells of flattened inline elements, header row first.
pub type TableRows = Vec<Vec<Vec<TextElement>>>;

/// Builds [`TableStructure`]s from collected table rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableStructureBuilder;

impl TableStructureBuilder {
    /// Build the persistence plan for one table.
    ///
    /// Column count is the header cell count; short rows are padded with
    /// empty cells and long rows truncated, so the cell list always holds
    /// exactly `row_size × column_size` entries. `total_width_budget` is
    /// distributed across the columns exactly (see [`allocate_widths`]).
    #[must_use]
    pub fn build(rows: TableRows, total_width_budget: u32) -> TableStructure {
        let row_size = rows.len();
        let column_size = rows.first().map_or(0, Vec::len).max(1);

        let column_widths = allocate_widths(&rows, column_size, total_width_budget);

        let mut cells = Vec::with_capacity(row_size * column_size);
        for mut row in rows {
            row.resize_with(column_size, Vec::new);
            for elements in row {
                // Exactly one text block per cell, empty cells included.
                cells.push(vec![Block::Text { elements }]);
            }
        }

        TableStructure { row_size, column_size, column_widths, cells }
    }
}

/// Distribute `budget` over `column_size` columns.
///
/// Measure each column's widest cell (wide characters double-weight), clamp
/// to `[MIN_COLUMN_WIDTH, 0.6 × budget]`, scale proportionally, round, then
/// push the rounding residual onto the last column so the sum is exactly
/// `budget`. Single-column tables take the whole budget unmeasured, and
/// all-empty tables fall back to equal distribution.
fn allocate_widths(rows: &TableRows, column_size: usize, budget: u32) -> Vec<u32> {
    if column_size == 1 {
        return vec![budget];
    }

    let mut raw = vec![0u32; column_size];
    for row in rows {
        for (column, cell) in row.iter().take(column_size).enumerate() {
            let weight: u32 = cell.iter().map(|el| display_weight(&el.content)).sum();
            raw[column] = raw[column].max(weight * PIXELS_PER_WEIGHT);
        }
    }

    if raw.iter().all(|&w| w == 0) {
        // Degenerate all-empty table: nothing to measure, share equally.
        return equal_distribution(column_size, budget);
    }

    let max_width = (f64::from(budget) * MAX_COLUMN_FRACTION).floor() as u32;
    let clamped: Vec<u32> = raw.iter().map(|&w| w.clamp(MIN_COLUMN_WIDTH, max_width)).collect();
    let clamped_sum: u32 = clamped.iter().sum();

    let mut widths: Vec<u32> = clamped
        .iter()
        .map(|&w| (f64::from(w) * f64::from(budget) / f64::from(clamped_sum)).round() as u32)
        .collect();

    // Exact-sum invariant: push the rounding residual onto the last column.
    let allocated: i64 = widths.iter().map(|&w| i64::from(w)).sum();
    let residual = i64::from(budget) - allocated;
    if let Some(last) = widths.last_mut() {
        *last = (i64::from(*last) + residual).max(0) as u32;
    }

    widths
}

fn equal_distribution(column_size: usize, budget: u32) -> Vec<u32> {
    let base = budget / column_size as u32;
    let mut widths = vec![base; column_size];
    if let Some(last) = widths.last_mut() {
        *last += budget - base * column_size as u32;
    }
    widths
}
