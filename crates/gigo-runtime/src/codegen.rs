//! C call-site emission for offloaded functions.
//!
//! A [`CallEmitter`] collects the statements one external function needs:
//! a heap buffer declaration per kernel output and one kernel call per
//! offloaded node, in visit order. Buffer names are `buf_0`, `buf_1`, ..
//! and are never reused within an emitter.

use gigo_kernels::Conv2dParams;
use tracing::trace;

use crate::attrs::{CallArg, Conv2dAttrs, call_args};
use crate::error::{Result, invalid_attr};
use crate::registry::OpKind;

/// An output buffer declared by the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    pub name: String,
    /// Size in `f32` elements.
    pub elements: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CallEmitter {
    ext_func_id: String,
    buf_idx: usize,
    buf_decls: Vec<String>,
    body: Vec<String>,
}

impl CallEmitter {
    pub fn new(ext_func_id: impl Into<String>) -> Self {
        Self { ext_func_id: ext_func_id.into(), ..Default::default() }
    }

    pub fn ext_func_id(&self) -> &str {
        &self.ext_func_id
    }

    /// Emit `<symbol>(<inputs>, <outputs>, <args>);`, declaring one buffer
    /// per entry of `output_elements`.
    pub fn emit_call(
        &mut self,
        op: OpKind,
        inputs: &[&str],
        output_elements: &[usize],
        args: &[CallArg],
    ) -> Result<Vec<OutputBuffer>> {
        if inputs.is_empty() {
            return Err(invalid_attr("inputs", "a kernel call needs at least one input"));
        }
        if output_elements.is_empty() {
            return Err(invalid_attr("outputs", "a kernel call needs at least one output"));
        }

        let mut operands: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        let mut outputs = Vec::with_capacity(output_elements.len());
        for &elements in output_elements {
            let name = format!("buf_{}", self.buf_idx);
            self.buf_idx += 1;
            self.buf_decls.push(format!("float* {name} = (float*)std::malloc(4 * {elements});"));
            operands.push(name.clone());
            outputs.push(OutputBuffer { name, elements });
        }
        operands.extend(args.iter().map(ToString::to_string));

        let call = format!("{}({});", op.symbol(), operands.join(", "));
        trace!(ext_func = %self.ext_func_id, call = %call, "emitted kernel call");
        self.body.push(call);
        Ok(outputs)
    }

    /// Lower a graph conv2d node and emit its call.
    pub fn emit_conv2d(
        &mut self,
        op: OpKind,
        data: &str,
        weights: &str,
        attrs: &Conv2dAttrs,
        data_shape: [usize; 4],
        weight_shape: [usize; 4],
    ) -> Result<OutputBuffer> {
        let params = attrs.lower(data_shape, weight_shape)?;
        self.emit_lowered(op, data, weights, &params)
    }

    /// Emit a call for already lowered parameters.
    pub fn emit_lowered(
        &mut self,
        op: OpKind,
        data: &str,
        weights: &str,
        params: &Conv2dParams,
    ) -> Result<OutputBuffer> {
        let elements = params.output_len()?;
        let mut outputs = self.emit_call(op, &[data, weights], &[elements], &call_args(params))?;
        // emit_call returns exactly one buffer per requested output.
        outputs.pop().ok_or_else(|| invalid_attr("outputs", "no output buffer declared"))
    }

    pub fn buffer_decls(&self) -> &[String] {
        &self.buf_decls
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    /// Buffer declarations followed by the call statements, one per line.
    pub fn finish(self) -> String {
        let mut out = String::new();
        for line in self.buf_decls.iter().chain(&self.body) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    #[test]
    fn emits_decl_and_call() {
        let mut emitter = CallEmitter::new("gigo_0");
        let out = emitter
            .emit_call(
                OpKind::Conv2d,
                &["gigo_0_i0", "gigo_0_i1"],
                &[8],
                &[CallArg::Layout(gigo_kernels::KernelLayout::Hwio), CallArg::Int(1)],
            )
            .unwrap();
        assert_eq!(out, vec![OutputBuffer { name: "buf_0".into(), elements: 8 }]);
        assert_eq!(emitter.buffer_decls(), ["float* buf_0 = (float*)std::malloc(4 * 8);"]);
        assert_eq!(emitter.body(), ["gigo_conv2d(gigo_0_i0, gigo_0_i1, buf_0, \"HWIO\", 1);"]);
    }

    #[test]
    fn buffer_indices_increase_across_calls() {
        let mut emitter = CallEmitter::new("gigo_1");
        let a = emitter.emit_call(OpKind::Conv2d, &["x"], &[4, 2], &[]).unwrap();
        let b = emitter.emit_call(OpKind::QuantConv2d, &["buf_0"], &[1], &[]).unwrap();
        let names: Vec<_> = a.iter().chain(&b).map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["buf_0", "buf_1", "buf_2"]);
        assert_eq!(emitter.body()[1], "gigo_quant_conv2d(buf_0, buf_2);");
    }

    #[test]
    fn finish_puts_declarations_first() {
        let mut emitter = CallEmitter::new("gigo_2");
        emitter.emit_call(OpKind::Conv2d, &["a"], &[1], &[]).unwrap();
        emitter.emit_call(OpKind::Conv2d, &["buf_0"], &[1], &[]).unwrap();
        let text = emitter.finish();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("float* buf_0"));
        assert!(lines[1].starts_with("float* buf_1"));
        assert!(lines[2].starts_with("gigo_conv2d(a,"));
    }

    #[test]
    fn rejects_call_without_inputs_or_outputs() {
        let mut emitter = CallEmitter::new("gigo_3");
        assert!(matches!(
            emitter.emit_call(OpKind::Conv2d, &[], &[1], &[]),
            Err(RuntimeError::InvalidAttribute { name: "inputs", .. })
        ));
        assert!(matches!(
            emitter.emit_call(OpKind::Conv2d, &["a"], &[], &[]),
            Err(RuntimeError::InvalidAttribute { name: "outputs", .. })
        ));
        assert!(emitter.body().is_empty());
    }

    #[test]
    fn emit_conv2d_sizes_output_from_attrs() {
        let mut emitter = CallEmitter::new("gigo_4");
        let attrs = Conv2dAttrs { padding: vec![1], ..Default::default() };
        let out = emitter
            .emit_conv2d(OpKind::Conv2d, "gigo_4_i0", "gigo_4_i1", &attrs, [1, 4, 4, 2], [3, 3, 2, 5])
            .unwrap();
        assert_eq!(out.elements, 4 * 4 * 5);
        assert_eq!(
            emitter.body()[0],
            "gigo_conv2d(gigo_4_i0, gigo_4_i1, buf_0, \"HWIO\", 1, 4, 4, 2, 5, 3, 3, 2, 1, 1, 1, 1, 1, 1, 1);"
        );
    }
}
