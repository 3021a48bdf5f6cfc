//! GRAPH <-> TABLE conversions.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{ConversionOptions, ConversionOutcome, TableType};
use crate::error::{ConversionError, ConvertResult};
use crate::model::{DataFormat, DataPayload, GraphEdge, GraphNode, GraphPayload, TablePayload};

/// Default relationship type for rows without a type column.
const DEFAULT_EDGE_TYPE: &str = "RELATED_TO";

/// Convert a graph to a table of its nodes or edges.
///
/// Columns are the structural fields of the selected view plus the union of
/// property keys in first-seen order. Missing properties become null cells.
/// Preservation counts properties retained per entity; the union of keys
/// retains everything, so loss only appears when a view has no entities to
/// carry.
pub fn graph_to_table(
    graph: &GraphPayload,
    options: &ConversionOptions,
) -> ConvertResult<ConversionOutcome> {
    let mut warnings = Vec::new();

    let dangling = graph.dangling_references();
    if !dangling.is_empty() {
        warnings.push(format!(
            "{} edge endpoint(s) reference unknown node ids: {}",
            dangling.len(),
            dangling.join(", ")
        ));
    }

    let table = match options.table_type {
        TableType::Nodes => nodes_table(graph),
        TableType::Edges => {
            if graph.edges.is_empty() && !graph.nodes.is_empty() {
                warnings.push("edges view requested for a graph with no edges".to_string());
            }
            edges_table(graph)
        }
    };

    debug!(
        view = %options.table_type,
        rows = table.rows.len(),
        columns = table.columns.len(),
        "Converted graph to table"
    );

    Ok(ConversionOutcome {
        data: DataPayload::Table(table),
        // The union of property keys keeps every property as a column.
        preservation_score: 1.0,
        warnings,
    })
}

fn property_key_union<'a, I>(property_maps: I) -> Vec<String>
where
    I: Iterator<Item = &'a Map<String, Value>>,
{
    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    for map in property_maps {
        for key in map.keys() {
            if seen.insert(key.clone()) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

fn nodes_table(graph: &GraphPayload) -> TablePayload {
    let property_keys = property_key_union(graph.nodes.iter().map(|n| &n.properties));

    let mut columns = vec!["id".to_string(), "label".to_string()];
    columns.extend(property_keys.iter().cloned());

    let rows = graph
        .nodes
        .iter()
        .map(|node| {
            let mut row = vec![
                Value::String(node.id.clone()),
                node.label
                    .as_ref()
                    .map(|l| Value::String(l.clone()))
                    .unwrap_or(Value::Null),
            ];
            for key in &property_keys {
                row.push(node.properties.get(key).cloned().unwrap_or(Value::Null));
            }
            row
        })
        .collect();

    TablePayload::new(columns, rows)
}

fn edges_table(graph: &GraphPayload) -> TablePayload {
    let property_keys = property_key_union(graph.edges.iter().map(|e| &e.properties));
    let any_weight = graph.edges.iter().any(|e| e.weight.is_some());

    let mut columns = vec![
        "source".to_string(),
        "target".to_string(),
        "type".to_string(),
    ];
    if any_weight {
        columns.push("weight".to_string());
    }
    columns.extend(property_keys.iter().cloned());

    let rows = graph
        .edges
        .iter()
        .map(|edge| {
            let mut row = vec![
                Value::String(edge.source.clone()),
                Value::String(edge.target.clone()),
                Value::String(edge.edge_type.clone()),
            ];
            if any_weight {
                row.push(
                    edge.weight
                        .and_then(|w| serde_json::Number::from_f64(w).map(Value::Number))
                        .unwrap_or(Value::Null),
                );
            }
            for key in &property_keys {
                row.push(edge.properties.get(key).cloned().unwrap_or(Value::Null));
            }
            row
        })
        .collect();

    TablePayload::new(columns, rows)
}

/// Convert a table to a graph, one edge per row.
///
/// `source_column` and `target_column` are required; `type_column` is
/// optional. Nodes are auto-created for any endpoint value not already seen,
/// and remaining columns become edge properties. Rows with a null endpoint
/// are skipped with a warning; preservation is the fraction of rows that
/// produced an edge.
pub fn table_to_graph(
    table: &TablePayload,
    options: &ConversionOptions,
) -> ConvertResult<ConversionOutcome> {
    let source_column =
        options
            .source_column
            .as_deref()
            .ok_or_else(|| ConversionError::MissingOption {
                option: "source_column".to_string(),
                source_format: DataFormat::Table,
                target_format: DataFormat::Graph,
            })?;
    let target_column =
        options
            .target_column
            .as_deref()
            .ok_or_else(|| ConversionError::MissingOption {
                option: "target_column".to_string(),
                source_format: DataFormat::Table,
                target_format: DataFormat::Graph,
            })?;

    let source_idx = table
        .column_index(source_column)
        .ok_or_else(|| ConversionError::MalformedPayload {
            format: DataFormat::Table,
            message: format!("source column '{}' not found", source_column),
        })?;
    let target_idx = table
        .column_index(target_column)
        .ok_or_else(|| ConversionError::MalformedPayload {
            format: DataFormat::Table,
            message: format!("target column '{}' not found", target_column),
        })?;

    let type_idx = match options.type_column.as_deref() {
        Some(name) => Some(table.column_index(name).ok_or_else(|| {
            ConversionError::MalformedPayload {
                format: DataFormat::Table,
                message: format!("type column '{}' not found", name),
            }
        })?),
        None => None,
    };

    let structural: HashSet<usize> = [Some(source_idx), Some(target_idx), type_idx]
        .into_iter()
        .flatten()
        .collect();

    let mut warnings = Vec::new();
    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut node_index: HashMap<String, usize> = HashMap::new();
    let mut edges = Vec::new();
    let mut skipped = 0usize;

    let ensure_node = |nodes: &mut Vec<GraphNode>,
                       node_index: &mut HashMap<String, usize>,
                       id: String| {
        if !node_index.contains_key(&id) {
            node_index.insert(id.clone(), nodes.len());
            nodes.push(GraphNode::new(id));
        }
    };

    for (row_num, row) in table.rows.iter().enumerate() {
        let source = row.get(source_idx).and_then(cell_to_id);
        let target = row.get(target_idx).and_then(cell_to_id);

        let (source, target) = match (source, target) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                skipped += 1;
                warnings.push(format!(
                    "row {} skipped: null or non-scalar endpoint value",
                    row_num
                ));
                continue;
            }
        };

        ensure_node(&mut nodes, &mut node_index, source.clone());
        ensure_node(&mut nodes, &mut node_index, target.clone());

        let edge_type = type_idx
            .and_then(|idx| row.get(idx))
            .and_then(cell_to_id)
            .unwrap_or_else(|| DEFAULT_EDGE_TYPE.to_string());

        let mut edge = GraphEdge::new(source, target, edge_type);
        for (col_idx, cell) in row.iter().enumerate() {
            if structural.contains(&col_idx) || cell.is_null() {
                continue;
            }
            if let Some(name) = table.columns.get(col_idx) {
                edge.properties.insert(name.clone(), cell.clone());
            }
        }
        edges.push(edge);
    }

    let total_rows = table.rows.len();
    let preservation_score = if total_rows == 0 {
        1.0
    } else {
        (total_rows - skipped) as f64 / total_rows as f64
    };

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        skipped,
        "Converted table to graph"
    );

    Ok(ConversionOutcome {
        data: DataPayload::Graph(GraphPayload { nodes, edges }),
        preservation_score,
        warnings,
    })
}

/// Scalar cell to node-id string; null/array/object cells have no id.
fn cell_to_id(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_graph() -> GraphPayload {
        GraphPayload {
            nodes: vec![
                GraphNode::new("1").with_label("Entity"),
                GraphNode::new("2").with_label("Entity"),
                GraphNode::new("3").with_label("Entity"),
            ],
            edges: vec![
                GraphEdge::new("1", "2", "RELATES"),
                GraphEdge::new("2", "3", "RELATES"),
            ],
        }
    }

    #[test]
    fn test_edges_view_structure() {
        let outcome = graph_to_table(&sample_graph(), &ConversionOptions::default()).unwrap();
        let table = outcome.data.as_table().unwrap();
        assert_eq!(table.rows.len(), 2);
        for col in ["source", "target", "type"] {
            assert!(table.column_index(col).is_some(), "missing column {}", col);
        }
        assert_eq!(outcome.preservation_score, 1.0);
    }

    #[test]
    fn test_nodes_view_includes_property_columns() {
        let mut graph = sample_graph();
        graph.nodes[0]
            .properties
            .insert("mentions".to_string(), json!(12));

        let options = ConversionOptions::default().with_table_type(TableType::Nodes);
        let outcome = graph_to_table(&graph, &options).unwrap();
        let table = outcome.data.as_table().unwrap();

        assert_eq!(table.rows.len(), 3);
        let mentions_idx = table.column_index("mentions").unwrap();
        assert_eq!(table.rows[0][mentions_idx], json!(12));
        // Nodes without the property get a null cell.
        assert_eq!(table.rows[1][mentions_idx], Value::Null);
    }

    #[test]
    fn test_weight_column_only_when_present() {
        let plain = graph_to_table(&sample_graph(), &ConversionOptions::default()).unwrap();
        assert!(plain
            .data
            .as_table()
            .unwrap()
            .column_index("weight")
            .is_none());

        let mut weighted = sample_graph();
        weighted.edges[0].weight = Some(0.7);
        let outcome = graph_to_table(&weighted, &ConversionOptions::default()).unwrap();
        let table = outcome.data.as_table().unwrap();
        let weight_idx = table.column_index("weight").unwrap();
        assert_eq!(table.rows[0][weight_idx], json!(0.7));
        assert_eq!(table.rows[1][weight_idx], Value::Null);
    }

    #[test]
    fn test_dangling_edges_warn_but_convert() {
        let mut graph = sample_graph();
        graph.edges.push(GraphEdge::new("3", "ghost", "RELATES"));

        let outcome = graph_to_table(&graph, &ConversionOptions::default()).unwrap();
        assert_eq!(outcome.data.as_table().unwrap().rows.len(), 3);
        assert!(outcome.warnings.iter().any(|w| w.contains("ghost")));
    }

    #[test]
    fn test_table_to_graph_auto_creates_nodes() {
        let table = TablePayload::new(
            vec!["from".into(), "to".into(), "rel".into(), "count".into()],
            vec![
                vec![json!("a"), json!("b"), json!("CITES"), json!(3)],
                vec![json!("b"), json!("c"), json!("CITES"), json!(1)],
            ],
        );
        let options = ConversionOptions::default()
            .with_source_column("from")
            .with_target_column("to")
            .with_type_column("rel");

        let outcome = table_to_graph(&table, &options).unwrap();
        let graph = outcome.data.as_graph().unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].edge_type, "CITES");
        assert_eq!(graph.edges[0].properties.get("count"), Some(&json!(3)));
        assert_eq!(outcome.preservation_score, 1.0);
    }

    #[test]
    fn test_table_to_graph_requires_endpoint_columns() {
        let table = TablePayload::new(vec!["a".into()], vec![vec![json!(1)]]);
        let result = table_to_graph(&table, &ConversionOptions::default());
        assert!(matches!(
            result,
            Err(ConversionError::MissingOption { .. })
        ));
    }

    #[test]
    fn test_table_to_graph_unknown_column_is_malformed() {
        let table = TablePayload::new(vec!["a".into()], vec![vec![json!(1)]]);
        let options = ConversionOptions::default()
            .with_source_column("a")
            .with_target_column("missing");
        let result = table_to_graph(&table, &options);
        assert!(matches!(
            result,
            Err(ConversionError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_table_to_graph_skips_null_endpoints() {
        let table = TablePayload::new(
            vec!["from".into(), "to".into()],
            vec![
                vec![json!("a"), json!("b")],
                vec![json!("a"), Value::Null],
            ],
        );
        let options = ConversionOptions::default()
            .with_source_column("from")
            .with_target_column("to");

        let outcome = table_to_graph(&table, &options).unwrap();
        assert_eq!(outcome.data.as_graph().unwrap().edges.len(), 1);
        assert_eq!(outcome.preservation_score, 0.5);
        assert!(!outcome.warnings.is_empty());
    }

    #[test]
    fn test_default_edge_type_without_type_column() {
        let table = TablePayload::new(
            vec!["from".into(), "to".into()],
            vec![vec![json!("x"), json!("y")]],
        );
        let options = ConversionOptions::default()
            .with_source_column("from")
            .with_target_column("to");
        let outcome = table_to_graph(&table, &options).unwrap();
        assert_eq!(
            outcome.data.as_graph().unwrap().edges[0].edge_type,
            DEFAULT_EDGE_TYPE
        );
    }

    #[test]
    fn test_round_trip_preserves_counts() {
        let graph = sample_graph();
        let to_table = graph_to_table(&graph, &ConversionOptions::default()).unwrap();
        let table = to_table.data.as_table().unwrap();

        let options = ConversionOptions::default()
            .with_source_column("source")
            .with_target_column("target")
            .with_type_column("type");
        let back = table_to_graph(table, &options).unwrap();
        let restored = back.data.as_graph().unwrap();

        assert_eq!(restored.nodes.len(), graph.nodes.len());
        assert_eq!(restored.edges.len(), graph.edges.len());
    }
}
