//! GRAPH <-> VECTOR conversions.

use ndarray::Array2;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{ConversionOptions, ConversionOutcome};
use crate::error::ConvertResult;
use crate::model::{DataPayload, GraphEdge, GraphNode, GraphPayload, VectorPayload};

/// Width of the structural feature encoding: total degree, in-degree,
/// out-degree, local clustering, property count, has-label flag.
pub(crate) const STRUCTURAL_FEATURE_COUNT: usize = 6;

/// Edge type used for similarity edges synthesized from vector rows.
const SIMILARITY_EDGE_TYPE: &str = "SIMILAR_TO";

/// Encode each node as a row of structural features.
///
/// Preservation is the share of encoded information: structural features
/// over structural features plus the distinct property keys the encoding
/// drops. A property-free graph scores 1.0; richer graphs score lower
/// because their property values are not carried into the feature rows.
pub fn graph_to_feature_vectors(graph: &GraphPayload) -> ConvertResult<ConversionOutcome> {
    let mut warnings = Vec::new();

    let dangling = graph.dangling_references();
    if !dangling.is_empty() {
        warnings.push(format!(
            "{} edge endpoint(s) reference unknown node ids: {}",
            dangling.len(),
            dangling.join(", ")
        ));
    }

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut out_degree: HashMap<&str, usize> = HashMap::new();
    let mut neighbors: HashMap<&str, HashSet<&str>> = HashMap::new();

    for edge in &graph.edges {
        *out_degree.entry(edge.source.as_str()).or_default() += 1;
        *in_degree.entry(edge.target.as_str()).or_default() += 1;
        neighbors
            .entry(edge.source.as_str())
            .or_default()
            .insert(edge.target.as_str());
        neighbors
            .entry(edge.target.as_str())
            .or_default()
            .insert(edge.source.as_str());
    }

    let mut flat = Vec::with_capacity(graph.nodes.len() * STRUCTURAL_FEATURE_COUNT);
    let mut row_ids = Vec::with_capacity(graph.nodes.len());

    for node in &graph.nodes {
        let id = node.id.as_str();
        let ind = *in_degree.get(id).unwrap_or(&0);
        let outd = *out_degree.get(id).unwrap_or(&0);
        flat.push((ind + outd) as f64);
        flat.push(ind as f64);
        flat.push(outd as f64);
        flat.push(local_clustering(id, &neighbors));
        flat.push(node.properties.len() as f64);
        flat.push(if node.label.is_some() { 1.0 } else { 0.0 });
        row_ids.push(node.id.clone());
    }

    let data = Array2::from_shape_vec((graph.nodes.len(), STRUCTURAL_FEATURE_COUNT), flat)
        .unwrap_or_else(|_| Array2::zeros((0, STRUCTURAL_FEATURE_COUNT)));

    let dropped_keys: HashSet<&String> = graph
        .nodes
        .iter()
        .flat_map(|n| n.properties.keys())
        .collect();
    let preservation_score = STRUCTURAL_FEATURE_COUNT as f64
        / (STRUCTURAL_FEATURE_COUNT + dropped_keys.len()) as f64;

    debug!(
        rows = graph.nodes.len(),
        dropped_property_keys = dropped_keys.len(),
        "Encoded graph as structural feature vectors"
    );

    Ok(ConversionOutcome {
        data: DataPayload::Vector(VectorPayload::new(data).with_row_ids(row_ids)),
        preservation_score,
        warnings,
    })
}

/// Local clustering coefficient over the undirected projection.
fn local_clustering(node: &str, neighbors: &HashMap<&str, HashSet<&str>>) -> f64 {
    let Some(own) = neighbors.get(node) else {
        return 0.0;
    };
    let k = own.len();
    if k < 2 {
        return 0.0;
    }

    let mut links = 0usize;
    let own_vec: Vec<&&str> = own.iter().collect();
    for (i, a) in own_vec.iter().enumerate() {
        for b in own_vec.iter().skip(i + 1) {
            if neighbors.get(**a).is_some_and(|set| set.contains(**b)) {
                links += 1;
            }
        }
    }
    (2 * links) as f64 / (k * (k - 1)) as f64
}

/// One line of text per node, fed to the embedding provider.
pub(crate) fn node_texts(graph: &GraphPayload) -> Vec<String> {
    graph
        .nodes
        .iter()
        .map(|node| {
            let mut text = match &node.label {
                Some(label) => format!("{} {}", label, node.id),
                None => node.id.clone(),
            };
            for (key, value) in &node.properties {
                text.push_str(&format!(" {}={}", key, value));
            }
            text
        })
        .collect()
}

/// Documented embedding preservation formula: the fraction of input
/// entities that produced a finite, non-zero embedding row.
pub(crate) fn score_embedding_rows(data: &Array2<f64>) -> f64 {
    if data.nrows() == 0 {
        return 1.0;
    }
    let usable = data
        .rows()
        .into_iter()
        .filter(|row| {
            row.iter().all(|v| v.is_finite()) && row.iter().any(|v| v.abs() > f64::EPSILON)
        })
        .count();
    usable as f64 / data.nrows() as f64
}

/// Convert vector rows back to a graph.
///
/// Each row becomes an isolated node carrying its values in an `embedding`
/// property, so no numeric content is lost. When a similarity threshold is
/// supplied, edges are added between rows whose cosine similarity exceeds
/// it.
pub fn vector_to_graph(
    vector: &VectorPayload,
    options: &ConversionOptions,
) -> ConvertResult<ConversionOutcome> {
    let mut nodes = Vec::with_capacity(vector.nrows());
    for (i, row) in vector.data.rows().into_iter().enumerate() {
        let id = vector
            .row_ids
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("row_{}", i));
        let values: Vec<Value> = row.iter().map(|v| json!(v)).collect();
        nodes.push(
            GraphNode::new(id)
                .with_property("embedding", Value::Array(values))
                .with_property("vector_index", json!(i)),
        );
    }

    let mut edges = Vec::new();
    if let Some(threshold) = options.similarity_threshold {
        for i in 0..vector.nrows() {
            for j in (i + 1)..vector.nrows() {
                let sim = cosine_similarity(
                    vector.data.row(i).as_slice().unwrap_or(&[]),
                    vector.data.row(j).as_slice().unwrap_or(&[]),
                );
                if sim > threshold {
                    edges.push(
                        GraphEdge::new(nodes[i].id.clone(), nodes[j].id.clone(), SIMILARITY_EDGE_TYPE)
                            .with_weight(sim),
                    );
                }
            }
        }
    }

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        threshold = ?options.similarity_threshold,
        "Converted vectors to graph"
    );

    Ok(ConversionOutcome {
        data: DataPayload::Graph(GraphPayload { nodes, edges }),
        // Every row value survives as a node property.
        preservation_score: 1.0,
        warnings: Vec::new(),
    })
}

pub(crate) fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphEdge;
    use serde_json::json;

    fn chain_graph() -> GraphPayload {
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
    fn test_feature_vectors_one_row_per_node() {
        let outcome = graph_to_feature_vectors(&chain_graph()).unwrap();
        let vector = outcome.data.as_vector().unwrap();
        assert_eq!(vector.nrows(), 3);
        assert_eq!(vector.dim(), STRUCTURAL_FEATURE_COUNT);
        assert!(vector.all_finite());
        assert_eq!(vector.row_ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_feature_vectors_degrees() {
        let outcome = graph_to_feature_vectors(&chain_graph()).unwrap();
        let vector = outcome.data.as_vector().unwrap();
        // Middle node of the chain: total 2, in 1, out 1.
        assert_eq!(vector.data[[1, 0]], 2.0);
        assert_eq!(vector.data[[1, 1]], 1.0);
        assert_eq!(vector.data[[1, 2]], 1.0);
        // Endpoints have total degree 1.
        assert_eq!(vector.data[[0, 0]], 1.0);
        assert_eq!(vector.data[[2, 0]], 1.0);
    }

    #[test]
    fn test_feature_score_drops_with_unencoded_properties() {
        let plain = graph_to_feature_vectors(&chain_graph()).unwrap();
        assert_eq!(plain.preservation_score, 1.0);

        let mut rich = chain_graph();
        rich.nodes[0]
            .properties
            .insert("mentions".to_string(), json!(4));
        rich.nodes[1]
            .properties
            .insert("salience".to_string(), json!(0.9));
        let scored = graph_to_feature_vectors(&rich).unwrap();
        assert!(scored.preservation_score < 1.0);
        assert!(scored.preservation_score > 0.0);
    }

    #[test]
    fn test_local_clustering_triangle() {
        let graph = GraphPayload {
            nodes: vec![GraphNode::new("a"), GraphNode::new("b"), GraphNode::new("c")],
            edges: vec![
                GraphEdge::new("a", "b", "E"),
                GraphEdge::new("b", "c", "E"),
                GraphEdge::new("c", "a", "E"),
            ],
        };
        let outcome = graph_to_feature_vectors(&graph).unwrap();
        let vector = outcome.data.as_vector().unwrap();
        // Every node in a triangle has clustering 1.0.
        for i in 0..3 {
            assert_eq!(vector.data[[i, 3]], 1.0);
        }
    }

    #[test]
    fn test_empty_graph_yields_zero_rows() {
        let outcome = graph_to_feature_vectors(&GraphPayload::new()).unwrap();
        let vector = outcome.data.as_vector().unwrap();
        assert_eq!(vector.nrows(), 0);
        assert_eq!(vector.dim(), STRUCTURAL_FEATURE_COUNT);
    }

    #[test]
    fn test_node_texts_include_label_and_properties() {
        let mut graph = chain_graph();
        graph.nodes[0]
            .properties
            .insert("field".to_string(), json!("biology"));
        let texts = node_texts(&graph);
        assert_eq!(texts.len(), 3);
        assert!(texts[0].starts_with("Entity 1"));
        assert!(texts[0].contains("field=\"biology\""));
    }

    #[test]
    fn test_score_embedding_rows_counts_usable() {
        let good = Array2::from_shape_vec((2, 2), vec![0.5, 0.5, 0.1, 0.9]).unwrap();
        assert_eq!(score_embedding_rows(&good), 1.0);

        let half = Array2::from_shape_vec((2, 2), vec![0.5, 0.5, 0.0, 0.0]).unwrap();
        assert_eq!(score_embedding_rows(&half), 0.5);
    }

    #[test]
    fn test_vector_to_graph_isolated_nodes() {
        let vector = VectorPayload::new(
            Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap(),
        );
        let outcome = vector_to_graph(&vector, &ConversionOptions::default()).unwrap();
        let graph = outcome.data.as_graph().unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes[0].id, "row_0");
        assert_eq!(outcome.preservation_score, 1.0);
    }

    #[test]
    fn test_vector_to_graph_similarity_edges() {
        let vector = VectorPayload::new(
            Array2::from_shape_vec(
                (3, 2),
                vec![1.0, 0.0, 0.99, 0.01, 0.0, 1.0],
            )
            .unwrap(),
        );
        let options = ConversionOptions::default().with_similarity_threshold(0.9);
        let outcome = vector_to_graph(&vector, &options).unwrap();
        let graph = outcome.data.as_graph().unwrap();
        // Rows 0 and 1 are nearly parallel; row 2 is orthogonal to both.
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].edge_type, SIMILARITY_EDGE_TYPE);
        assert!(graph.edges[0].weight.unwrap() > 0.9);
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
