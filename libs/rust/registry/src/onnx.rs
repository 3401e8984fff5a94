//! ONNX inference through tract.
//!
//! Models are expected to take one graph input per feature column, named after
//! the column (the layout produced by column-wise sklearn pipeline exports).
//! The row dimension is pinned to a single row.

use crate::frame::{Cell, CellKind, Frame};
use crate::predictor::Predictor;
use anyhow::{anyhow, bail, ensure, Context};
use std::path::Path;
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::infer::Factoid;

const SUPPORTED_TYPES: [DatumType; 5] = [DatumType::F32, DatumType::F64, DatumType::I64, DatumType::I32, DatumType::String];

#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: String,
    pub datum_type: DatumType,
    /// 1 for `[rows]`, 2 for `[rows, 1]`.
    pub rank: usize,
}

impl InputSpec {
    fn shape(&self, rows: usize) -> Vec<usize> {
        if self.rank == 1 { vec![rows] } else { vec![rows, 1] }
    }
}

#[derive(Debug)]
pub struct OnnxPredictor {
    plan: TypedRunnableModel<TypedModel>,
    inputs: Vec<InputSpec>,
}

impl OnnxPredictor {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let outlets = model.inputs.clone();
        let mut inputs = Vec::with_capacity(outlets.len());
        for (ix, outlet) in outlets.iter().enumerate() {
            let name = model.node(outlet.node).name.clone();
            let fact = model.input_fact(ix)?;
            let datum_type = fact.datum_type.concretize().ok_or_else(|| anyhow!("input `{name}` declares no element type"))?;
            ensure!(SUPPORTED_TYPES.contains(&datum_type), "input `{name}` has unsupported element type {datum_type:?}");
            let rank = match fact.shape.rank().concretize() {
                Some(1) => 1,
                Some(2) | None => 2,
                Some(other) => bail!("input `{name}` has rank {other}, expected a column of rank 1 or 2"),
            };
            let spec = InputSpec { name, datum_type, rank };
            model.set_input_fact(ix, InferenceFact::dt_shape(datum_type, spec.shape(1)))?;
            inputs.push(spec);
        }
        let plan = model
            .into_optimized()
            .with_context(|| format!("optimizing {}", path.display()))?
            .into_runnable()?;
        Ok(Self { plan, inputs })
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> { self.inputs.iter().map(|s| s.name.as_str()) }

    pub fn inputs(&self) -> &[InputSpec] { &self.inputs }
}

/// Whether an input of `datum_type` can be fed from cells of `kind`.
/// Integer inputs only take integer columns so fractional values never reach them.
pub fn accepts(datum_type: DatumType, kind: CellKind) -> bool {
    match datum_type {
        DatumType::F32 | DatumType::F64 => matches!(kind, CellKind::Integer | CellKind::Float),
        DatumType::I64 | DatumType::I32 => kind == CellKind::Integer,
        DatumType::String => kind == CellKind::String,
        _ => false,
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, frame: &Frame) -> anyhow::Result<Vec<f64>> {
        ensure!(frame.height() == 1, "model takes exactly one row, got {}", frame.height());
        let values = self
            .inputs
            .iter()
            .map(|spec| {
                let cells = frame.column(&spec.name).ok_or_else(|| anyhow!("input column `{}` missing", spec.name))?;
                column_tensor(spec, cells).map(TValue::from)
            })
            .collect::<anyhow::Result<TVec<TValue>>>()?;
        let outputs = self.plan.run(values)?;
        let first = outputs.first().ok_or_else(|| anyhow!("model produced no outputs"))?;
        let cast = first.cast_to::<f64>()?;
        Ok(cast.as_slice::<f64>()?.to_vec())
    }
}

/// Builds the tensor for one input column, converting cells to the declared
/// element type.
pub(crate) fn column_tensor(spec: &InputSpec, cells: &[Cell]) -> anyhow::Result<Tensor> {
    let shape = spec.shape(cells.len());
    let mismatch = |cell: &Cell| anyhow!("column `{}` expects {:?}, got {} value `{cell}`", spec.name, spec.datum_type, cell.kind());
    let tensor = match spec.datum_type {
        DatumType::F64 => {
            let vals = cells.iter().map(|c| c.as_f64().ok_or_else(|| mismatch(c))).collect::<anyhow::Result<Vec<f64>>>()?;
            Tensor::from(tract_ndarray::ArrayD::from_shape_vec(shape, vals)?)
        }
        DatumType::F32 => {
            let vals = cells.iter().map(|c| c.as_f64().map(|v| v as f32).ok_or_else(|| mismatch(c))).collect::<anyhow::Result<Vec<f32>>>()?;
            Tensor::from(tract_ndarray::ArrayD::from_shape_vec(shape, vals)?)
        }
        DatumType::I64 => {
            let vals = cells.iter().map(|c| c.as_i64().ok_or_else(|| mismatch(c))).collect::<anyhow::Result<Vec<i64>>>()?;
            Tensor::from(tract_ndarray::ArrayD::from_shape_vec(shape, vals)?)
        }
        DatumType::I32 => {
            let vals = cells
                .iter()
                .map(|c| c.as_i64().and_then(|v| i32::try_from(v).ok()).ok_or_else(|| mismatch(c)))
                .collect::<anyhow::Result<Vec<i32>>>()?;
            Tensor::from(tract_ndarray::ArrayD::from_shape_vec(shape, vals)?)
        }
        DatumType::String => {
            let vals = cells.iter().map(|c| c.as_str().map(str::to_string).ok_or_else(|| mismatch(c))).collect::<anyhow::Result<Vec<String>>>()?;
            Tensor::from(tract_ndarray::ArrayD::from_shape_vec(shape, vals)?)
        }
        other => bail!("column `{}` has unsupported element type {other:?}", spec.name),
    };
    Ok(tensor)
}
