//! Structural codec between generic decoded JSON and [`Value`]s.
//!
//! Decoding is guided recursively by a [`TypeDescriptor`]. Binary trees use
//! the level-order form with `null` for absent children, linked lists are flat
//! sequences, and graphs are `[u, v]` edge lists keyed by source vertex.
//!
//! `encode(decode(x))` reproduces `x` for scalars, arrays and matrices. Trees
//! are re-serialized breadth-first with trailing `null`s trimmed, so "don't
//! care" nulls in the input are not preserved.

use std::collections::VecDeque;

use serde_json::Value as Json;

use crate::core::descriptor::{Kind, ScalarKind, TypeDescriptor};
use crate::core::error::{CodecError, CodecResult};
use crate::core::value::{Graph, ListNode, TreeNode, Value};

/// Convert a generic value into the structure `descriptor` names.
pub fn decode(value: &Json, descriptor: &TypeDescriptor) -> CodecResult<Value> {
    match descriptor.resolved_kind() {
        Kind::Scalar(kind) => decode_scalar(value, kind),
        Kind::Array => {
            let element = descriptor.element()?;
            let items = expect_sequence(value, descriptor)?;
            let decoded = items
                .iter()
                .map(|item| decode(item, element))
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(Value::Array(decoded))
        }
        Kind::Matrix => {
            let element = descriptor.element()?;
            let rows = expect_sequence(value, descriptor)?;
            let mut decoded = Vec::with_capacity(rows.len());
            for row in rows {
                let cells = match row {
                    Json::Array(cells) => cells,
                    other => {
                        return Err(CodecError::mismatch(
                            format!("{descriptor} row"),
                            describe(other),
                        ));
                    }
                };
                decoded.push(
                    cells
                        .iter()
                        .map(|cell| decode(cell, element))
                        .collect::<CodecResult<Vec<_>>>()?,
                );
            }
            Ok(Value::Matrix(decoded))
        }
        Kind::BinaryTree => {
            require_integer_child(descriptor)?;
            let items = expect_sequence(value, descriptor)?;
            decode_tree(items).map(Value::BinaryTree)
        }
        Kind::LinkedList => {
            require_integer_child(descriptor)?;
            let items = expect_sequence(value, descriptor)?;
            let values = items
                .iter()
                .map(decode_integer)
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(Value::LinkedList(ListNode::from_values(values)))
        }
        Kind::Graph => {
            require_integer_child(descriptor)?;
            let edges = expect_sequence(value, descriptor)?;
            decode_graph(edges).map(Value::Graph)
        }
    }
}

/// Convert a structure back into its generic form.
pub fn encode(value: &Value, descriptor: &TypeDescriptor) -> CodecResult<Json> {
    match (descriptor.resolved_kind(), value) {
        (Kind::Scalar(ScalarKind::Integer), Value::Integer(number)) => Ok(Json::from(*number)),
        (Kind::Scalar(ScalarKind::Double), Value::Double(number)) => {
            serde_json::Number::from_f64(*number)
                .map(Json::Number)
                .ok_or_else(|| CodecError::mismatch("finite Double", number.to_string()))
        }
        (Kind::Scalar(ScalarKind::String), Value::String(text)) => Ok(Json::from(text.as_str())),
        (Kind::Scalar(ScalarKind::Boolean), Value::Boolean(flag)) => Ok(Json::from(*flag)),
        (Kind::Array, Value::Array(items)) => {
            let element = descriptor.element()?;
            items
                .iter()
                .map(|item| encode(item, element))
                .collect::<CodecResult<Vec<_>>>()
                .map(Json::Array)
        }
        (Kind::Matrix, Value::Matrix(rows)) => {
            let element = descriptor.element()?;
            let mut encoded = Vec::with_capacity(rows.len());
            for row in rows {
                encoded.push(Json::Array(
                    row.iter()
                        .map(|cell| encode(cell, element))
                        .collect::<CodecResult<Vec<_>>>()?,
                ));
            }
            Ok(Json::Array(encoded))
        }
        (Kind::BinaryTree, Value::BinaryTree(root)) => {
            require_integer_child(descriptor)?;
            Ok(encode_tree(root.as_deref()))
        }
        (Kind::LinkedList, Value::LinkedList(head)) => {
            require_integer_child(descriptor)?;
            let values = head
                .as_deref()
                .map(|node| node.values().map(Json::from).collect())
                .unwrap_or_default();
            Ok(Json::Array(values))
        }
        (Kind::Graph, Value::Graph(graph)) => {
            require_integer_child(descriptor)?;
            let edges = graph
                .edges()
                .map(|(from, to)| Json::Array(vec![Json::from(from), Json::from(to)]))
                .collect();
            Ok(Json::Array(edges))
        }
        (_, other) => Err(CodecError::mismatch(
            descriptor.to_string(),
            other.type_name(),
        )),
    }
}

fn decode_scalar(value: &Json, kind: ScalarKind) -> CodecResult<Value> {
    let decoded = match (kind, value) {
        (ScalarKind::Integer, _) => Some(Value::Integer(decode_integer(value)?)),
        (ScalarKind::Double, Json::Number(number)) => number.as_f64().map(Value::Double),
        (ScalarKind::String, Json::String(text)) => Some(Value::String(text.clone())),
        (ScalarKind::Boolean, Json::Bool(flag)) => Some(Value::Boolean(*flag)),
        _ => None,
    };
    decoded.ok_or_else(|| CodecError::mismatch(Kind::Scalar(kind).name(), describe(value)))
}

fn decode_integer(value: &Json) -> CodecResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| CodecError::mismatch("Integer", describe(value)))
}

fn decode_tree(items: &[Json]) -> CodecResult<Option<Box<TreeNode>>> {
    let slots = items
        .iter()
        .map(|item| match item {
            Json::Null => Ok(None),
            other => decode_integer(other).map(Some),
        })
        .collect::<CodecResult<Vec<Option<i64>>>>()?;

    if !matches!(slots.first(), Some(Some(_))) {
        return Ok(None);
    }

    // Assign child slots in level order; each dequeued node consumes the next
    // two positions, nulls included.
    let mut links: Vec<(Option<usize>, Option<usize>)> = vec![(None, None); slots.len()];
    let mut queue = VecDeque::from([0usize]);
    let mut cursor = 1;
    while cursor < slots.len() {
        let Some(parent) = queue.pop_front() else {
            break;
        };
        if slots[cursor].is_some() {
            links[parent].0 = Some(cursor);
            queue.push_back(cursor);
        }
        cursor += 1;
        if cursor < slots.len() && slots[cursor].is_some() {
            links[parent].1 = Some(cursor);
            queue.push_back(cursor);
        }
        cursor += 1;
    }

    // Children always sit at higher positions than their parent, so building
    // from the back assembles every subtree before it is attached.
    let mut built: Vec<Option<Box<TreeNode>>> = (0..slots.len()).map(|_| None).collect();
    for index in (0..slots.len()).rev() {
        let Some(value) = slots[index] else {
            continue;
        };
        let (left, right) = links[index];
        let left = left.and_then(|child| built[child].take());
        let right = right.and_then(|child| built[child].take());
        built[index] = Some(Box::new(TreeNode::with_children(value, left, right)));
    }
    Ok(built[0].take())
}

fn encode_tree(root: Option<&TreeNode>) -> Json {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(slot) = queue.pop_front() {
        match slot {
            Some(node) => {
                out.push(Json::from(node.value));
                queue.push_back(node.left.as_deref());
                queue.push_back(node.right.as_deref());
            }
            None => out.push(Json::Null),
        }
    }
    while matches!(out.last(), Some(Json::Null)) {
        out.pop();
    }
    Json::Array(out)
}

fn decode_graph(edges: &[Json]) -> CodecResult<Graph> {
    let mut graph = Graph::new();
    for edge in edges {
        let pair = match edge {
            Json::Array(pair) if pair.len() == 2 => pair,
            other => {
                return Err(CodecError::MalformedEdge {
                    edge: other.to_string(),
                });
            }
        };
        graph.add_edge(decode_integer(&pair[0])?, decode_integer(&pair[1])?);
    }
    Ok(graph)
}

fn require_integer_child(descriptor: &TypeDescriptor) -> CodecResult<()> {
    let child = descriptor.element()?;
    if child.resolved_kind() != Kind::INTEGER {
        return Err(CodecError::InvalidChildType {
            kind: descriptor.resolved_kind().name().to_string(),
            child: child.to_string(),
        });
    }
    Ok(())
}

fn expect_sequence<'a>(value: &'a Json, descriptor: &TypeDescriptor) -> CodecResult<&'a [Json]> {
    match value {
        Json::Array(items) => Ok(items),
        other => Err(CodecError::mismatch(descriptor.to_string(), describe(other))),
    }
}

fn describe(value: &Json) -> String {
    let tag = match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    };
    match value {
        Json::Null => tag.to_string(),
        other => format!("{tag} {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ints() -> TypeDescriptor {
        TypeDescriptor::array(TypeDescriptor::integer())
    }

    fn tree() -> TypeDescriptor {
        TypeDescriptor::binary_tree(TypeDescriptor::integer())
    }

    fn list() -> TypeDescriptor {
        TypeDescriptor::linked_list(TypeDescriptor::integer())
    }

    fn graph() -> TypeDescriptor {
        TypeDescriptor::graph(TypeDescriptor::integer())
    }

    fn round_trip(input: Json, descriptor: &TypeDescriptor) -> Json {
        let decoded = decode(&input, descriptor).expect("decode");
        encode(&decoded, descriptor).expect("encode")
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(
            decode(&json!(7), &TypeDescriptor::integer()).expect("int"),
            Value::Integer(7)
        );
        assert_eq!(
            decode(&json!(2), &TypeDescriptor::double()).expect("double"),
            Value::Double(2.0)
        );
        assert_eq!(
            decode(&json!("abc"), &TypeDescriptor::string()).expect("string"),
            Value::String("abc".to_string())
        );
        assert_eq!(
            decode(&json!(true), &TypeDescriptor::boolean()).expect("bool"),
            Value::Boolean(true)
        );
    }

    #[test]
    fn scalar_tag_mismatch_is_rejected() {
        let err = decode(&json!("7"), &TypeDescriptor::integer()).expect_err("mismatch");
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                expected: "Integer".to_string(),
                found: "string \"7\"".to_string(),
            }
        );
        let err = decode(&json!(1.5), &TypeDescriptor::integer()).expect_err("fraction");
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
        let err = decode(&Json::Null, &TypeDescriptor::boolean()).expect_err("null");
        assert!(err.to_string().contains("got null"));
    }

    #[test]
    fn arrays_and_matrices_round_trip() {
        assert_eq!(round_trip(json!([7, 6, 4, 3, 1]), &ints()), json!([7, 6, 4, 3, 1]));
        assert_eq!(round_trip(json!([]), &ints()), json!([]));

        let strings = TypeDescriptor::array(TypeDescriptor::string());
        assert_eq!(round_trip(json!(["a", "b"]), &strings), json!(["a", "b"]));

        let matrix = TypeDescriptor::matrix(TypeDescriptor::integer());
        let ragged = json!([[1, 2, 3], [4], []]);
        assert_eq!(round_trip(ragged.clone(), &matrix), ragged);

        let nested = TypeDescriptor::array(ints());
        assert_eq!(round_trip(json!([[1], [2, 3]]), &nested), json!([[1], [2, 3]]));
    }

    #[test]
    fn array_element_mismatch_names_type() {
        let err = decode(&json!([1, "x"]), &ints()).expect_err("mismatch");
        assert!(err.to_string().contains("expected Integer"));

        let matrix = TypeDescriptor::matrix(TypeDescriptor::integer());
        let err = decode(&json!([1, 2]), &matrix).expect_err("row");
        assert!(err.to_string().contains("Matrix<Integer> row"));
    }

    #[test]
    fn tree_decodes_level_order() {
        let decoded = decode(&json!([1, 2, 3, null, 4]), &tree()).expect("tree");
        let expected = Value::BinaryTree(Some(Box::new(TreeNode::with_children(
            1,
            Some(Box::new(TreeNode::with_children(
                2,
                None,
                Some(Box::new(TreeNode::new(4))),
            ))),
            Some(Box::new(TreeNode::new(3))),
        ))));
        assert_eq!(decoded, expected);
    }

    #[test]
    fn tree_round_trips_and_trims() {
        assert_eq!(round_trip(json!([1, 2, 3]), &tree()), json!([1, 2, 3]));
        assert_eq!(round_trip(json!([1, null, 3]), &tree()), json!([1, null, 3]));
        assert_eq!(round_trip(json!([1, 2, null, null]), &tree()), json!([1, 2]));
        assert_eq!(
            round_trip(json!([5, 4, 8, 11, null, 13, 4, 7, 2]), &tree()),
            json!([5, 4, 8, 11, null, 13, 4, 7, 2])
        );
    }

    #[test]
    fn deep_skewed_tree_decodes_compares_and_drops() {
        let mut items = vec![json!(0)];
        for value in 1..50_000 {
            items.push(Json::Null);
            items.push(json!(value));
        }
        let input = Json::Array(items);
        let first = decode(&input, &tree()).expect("first decode");
        let second = decode(&input, &tree()).expect("second decode");
        assert_eq!(first, second);
        assert_eq!(encode(&first, &tree()).expect("encode"), input);
        drop(first);
        drop(second);
    }

    #[test]
    fn nulls_below_absent_parents_are_not_children() {
        // Node 2 has no children; the trailing 9 belongs to node 3.
        let decoded = decode(&json!([1, 2, 3, null, null, 9]), &tree()).expect("tree");
        assert_eq!(encode(&decoded, &tree()).expect("encode"), json!([1, 2, 3, null, null, 9]));
    }

    #[test]
    fn empty_tree_is_absent() {
        let decoded = decode(&json!([]), &tree()).expect("tree");
        assert_eq!(decoded, Value::BinaryTree(None));
        assert_eq!(encode(&decoded, &tree()).expect("encode"), json!([]));
        assert_eq!(
            decode(&json!([null]), &tree()).expect("null root"),
            Value::BinaryTree(None)
        );
    }

    #[test]
    fn tree_requires_integer_child() {
        let descriptor = TypeDescriptor::binary_tree(TypeDescriptor::string());
        let err = decode(&json!(["a"]), &descriptor).expect_err("invalid child");
        assert_eq!(
            err,
            CodecError::InvalidChildType {
                kind: "TreeNode".to_string(),
                child: "String".to_string(),
            }
        );
    }

    #[test]
    fn list_decodes_in_order() {
        let decoded = decode(&json!([1, 2, 3]), &list()).expect("list");
        let Value::LinkedList(Some(head)) = &decoded else {
            panic!("expected present list");
        };
        assert_eq!(head.values().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(encode(&decoded, &list()).expect("encode"), json!([1, 2, 3]));
        assert_eq!(decode(&json!([]), &list()).expect("empty"), Value::LinkedList(None));
        assert_eq!(encode(&Value::LinkedList(None), &list()).expect("encode"), json!([]));
    }

    #[test]
    fn list_and_graph_require_integer_child() {
        let descriptor = TypeDescriptor::linked_list(TypeDescriptor::double());
        assert!(matches!(
            decode(&json!([1.5]), &descriptor),
            Err(CodecError::InvalidChildType { .. })
        ));
        let descriptor = TypeDescriptor::graph(TypeDescriptor::boolean());
        assert!(matches!(
            decode(&json!([]), &descriptor),
            Err(CodecError::InvalidChildType { .. })
        ));
    }

    #[test]
    fn graph_builds_source_keyed_adjacency() {
        let decoded = decode(&json!([[0, 1], [1, 2], [2, 0]]), &graph()).expect("graph");
        let Value::Graph(graph_value) = &decoded else {
            panic!("expected graph");
        };
        assert_eq!(graph_value.neighbors(0), Some(&[1][..]));
        assert_eq!(graph_value.neighbors(1), Some(&[2][..]));
        assert_eq!(graph_value.neighbors(2), Some(&[0][..]));
        assert_eq!(graph_value.adjacency().len(), 3);
    }

    #[test]
    fn graph_targets_do_not_get_entries() {
        let decoded = decode(&json!([[0, 1], [0, 2], [0, 1]]), &graph()).expect("graph");
        let Value::Graph(graph_value) = &decoded else {
            panic!("expected graph");
        };
        assert_eq!(graph_value.neighbors(0), Some(&[1, 2, 1][..]));
        assert_eq!(graph_value.neighbors(1), None);
        assert_eq!(
            encode(&decoded, &graph()).expect("encode"),
            json!([[0, 1], [0, 2], [0, 1]])
        );
    }

    #[test]
    fn malformed_edge_is_rejected() {
        let err = decode(&json!([[0, 1], [0, 1, 2]]), &graph()).expect_err("edge");
        assert_eq!(
            err,
            CodecError::MalformedEdge {
                edge: "[0,1,2]".to_string(),
            }
        );
        assert!(err.to_string().contains("[0,1,2]"));
    }

    #[test]
    fn encode_rejects_wrong_variant() {
        let err = encode(&Value::String("1".to_string()), &TypeDescriptor::integer())
            .expect_err("mismatch");
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                expected: "Integer".to_string(),
                found: "String".to_string(),
            }
        );
    }
}
