use tracing::debug;

use crate::engine::core::column::stream_path::nested_table_name;
use crate::engine::core::column::{Block, Column, DataType};
use crate::engine::core::part::NameAndType;
use crate::engine::errors::{LogicError, PartReadError};

/// Adds default-filled columns for every name of `ordered_names` missing from
/// `block`, then reorders the block to `ordered_names` when something was
/// added or `always_reorder` is set. Reordering drops unlisted columns.
pub fn fill_missing_columns<S: AsRef<str>>(
    block: &mut Block,
    available: &[NameAndType],
    ordered_names: &[S],
    always_reorder: bool,
) -> Result<(), PartReadError> {
    if block.is_empty() {
        return Err(LogicError::EmptyBlock.into());
    }
    let rows = block.rows()?;

    let mut added = false;
    for name in ordered_names {
        let name = name.as_ref();
        if block.has(name) {
            continue;
        }
        let column = available
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| LogicError::UnsatisfiableOrder(name.to_string()))?;
        let defaults = default_column(block, column, rows);
        block.insert(name, column.data_type.clone(), defaults);
        added = true;
    }

    if added || always_reorder {
        let dropped = block.reorder(ordered_names);
        if !dropped.is_empty() {
            debug!(
                target: "part_reader::fill",
                ?dropped,
                "Dropped columns not in the requested order"
            );
        }
    }
    Ok(())
}

/// Defaults for a missing column. Arrays of a nested table take the shape of
/// a sibling already in the block.
fn default_column(block: &Block, column: &NameAndType, rows: usize) -> Column {
    if let DataType::Array(element) = &column.data_type {
        let table = nested_table_name(&column.name);
        if table != column.name {
            let sibling_offsets = block.iter().find_map(|(name, present)| {
                if name != column.name && nested_table_name(name) == table {
                    present.column.array_offsets()
                } else {
                    None
                }
            });
            if let Some(offsets) = sibling_offsets {
                return Column::arrays_of_defaults(element, offsets);
            }
        }
    }
    Column::with_defaults(&column.data_type, rows)
}
