use crate::engine::core::column::data_type::DataType;
use crate::shared::path::escape_for_file_name;

/// One step from a column down to one of its physical streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Substream {
    NullMap,
    NullableElements,
    ArraySizes,
    ArrayElements,
    TupleElement(usize),
}

pub type SubstreamPath = Vec<Substream>;

/// Calls `visit` with the path of every physical stream of `data_type`, in
/// the order a reader consumes them.
pub fn for_each_stream<F>(data_type: &DataType, visit: &mut F)
where
    F: FnMut(&[Substream]),
{
    fn walk<F: FnMut(&[Substream])>(data_type: &DataType, path: &mut SubstreamPath, visit: &mut F) {
        match data_type {
            DataType::Array(inner) => {
                path.push(Substream::ArraySizes);
                visit(path);
                path.pop();
                path.push(Substream::ArrayElements);
                walk(inner, path, visit);
                path.pop();
            }
            DataType::Nullable(inner) => {
                path.push(Substream::NullMap);
                visit(path);
                path.pop();
                path.push(Substream::NullableElements);
                walk(inner, path, visit);
                path.pop();
            }
            DataType::Tuple(elems) => {
                for (i, elem) in elems.iter().enumerate() {
                    path.push(Substream::TupleElement(i));
                    walk(elem, path, visit);
                    path.pop();
                }
            }
            _ => visit(path),
        }
    }
    walk(data_type, &mut Vec::new(), visit);
}

pub fn stream_paths(data_type: &DataType) -> Vec<SubstreamPath> {
    let mut paths = Vec::new();
    for_each_stream(data_type, &mut |path| paths.push(path.to_vec()));
    paths
}

/// Name of the nested table a column belongs to: `n` for `n.a`.
pub fn nested_table_name(column: &str) -> &str {
    column.split_once('.').map_or(column, |(table, _)| table)
}

/// True when the stream is the top-level sizes stream shared by all columns
/// of a nested table.
pub fn is_shared_nested_sizes(column: &str, path: &[Substream]) -> bool {
    path == [Substream::ArraySizes] && nested_table_name(column) != column
}

/// File stem of a stream: escaped column name plus one suffix per level.
/// Columns of one nested table share their level-0 sizes stream
/// (`n.a`, `n.b` → `n.size0`).
pub fn stream_file_stem(column: &str, path: &[Substream]) -> String {
    let base = if is_shared_nested_sizes(column, path) {
        nested_table_name(column)
    } else {
        column
    };
    let mut stem = escape_for_file_name(base);
    let mut array_level = 0;
    for step in path {
        match step {
            Substream::NullMap => stem.push_str(".null"),
            Substream::ArraySizes => stem.push_str(&format!(".size{array_level}")),
            Substream::ArrayElements => array_level += 1,
            Substream::NullableElements => {}
            Substream::TupleElement(i) => stem.push_str(&format!(".{}", i + 1)),
        }
    }
    stem
}

/// Stems of every stream of a column, in read order.
pub fn column_stream_stems(column: &str, data_type: &DataType) -> Vec<String> {
    stream_paths(data_type)
        .iter()
        .map(|path| stream_file_stem(column, path))
        .collect()
}
