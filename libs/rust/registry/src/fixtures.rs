//! Small ONNX graphs and file-store layouts for tests.
//!
//! Enabled for this crate's own tests and, through the `test-fixtures`
//! feature, for dependents' tests.

use prost::Message;
use std::fs;
use std::io;
use std::path::Path;
use tract_onnx::pb::{self, tensor_shape_proto::dimension, tensor_shape_proto::Dimension, type_proto};

/// ONNX element type codes.
pub const FLOAT: i32 = 1;
pub const INT64: i32 = 7;
pub const STRING: i32 = 8;

/// `MLmodel` with an onnx flavor and no signature.
pub const ONNX_MLMODEL: &str = "flavors:\n  onnx:\n    data: model.onnx\n";

fn column(name: &str, elem_type: i32) -> pb::ValueInfoProto {
    let dim = vec![
        Dimension { value: Some(dimension::Value::DimParam("N".into())), ..Default::default() },
        Dimension { value: Some(dimension::Value::DimValue(1)), ..Default::default() },
    ];
    pb::ValueInfoProto {
        name: name.into(),
        r#type: Some(pb::TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type,
                shape: Some(pb::TensorShapeProto { dim }),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn node(op: &str, inputs: &[&str], output: &str, attribute: Vec<pb::AttributeProto>) -> pb::NodeProto {
    pb::NodeProto {
        op_type: op.into(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: vec![output.into()],
        name: output.into(),
        attribute,
        ..Default::default()
    }
}

/// Serialized graph computing `float(Age) + Study_Hours_Per_Day`.
/// `extra` inputs are declared after those two and left unused.
pub fn age_plus_hours(extra: &[(&str, i32)]) -> Vec<u8> {
    let to_float = pb::AttributeProto {
        name: "to".into(),
        i: i64::from(FLOAT),
        r#type: pb::attribute_proto::AttributeType::Int as i32,
        ..Default::default()
    };
    let mut input = vec![column("Age", INT64), column("Study_Hours_Per_Day", FLOAT)];
    input.extend(extra.iter().map(|(name, elem)| column(name, *elem)));
    let graph = pb::GraphProto {
        name: "age_plus_hours".into(),
        node: vec![
            node("Cast", &["Age"], "age_f", vec![to_float]),
            node("Add", &["age_f", "Study_Hours_Per_Day"], "variable", vec![]),
        ],
        input,
        output: vec![column("variable", FLOAT)],
        ..Default::default()
    };
    pb::ModelProto {
        ir_version: 8,
        opset_import: vec![pb::OperatorSetIdProto { domain: String::new(), version: 13 }],
        graph: Some(graph),
        ..Default::default()
    }
    .encode_to_vec()
}

/// Registers version 1 of `name` in the `Production` stage of a file store at
/// `root`, with `mlmodel` and `graph` as its artifacts.
pub fn register(root: &Path, name: &str, mlmodel: &str, graph: &[u8]) -> io::Result<()> {
    let version_dir = root.join("models").join(name).join("version-1");
    fs::create_dir_all(&version_dir)?;
    let source = format!("artifacts/{name}/1");
    fs::write(version_dir.join("meta.yaml"), format!("version: 1\ncurrent_stage: Production\nsource: {source}\n"))?;
    let artifacts = root.join(&source);
    fs::create_dir_all(&artifacts)?;
    fs::write(artifacts.join("MLmodel"), mlmodel)?;
    fs::write(artifacts.join("model.onnx"), graph)
}
