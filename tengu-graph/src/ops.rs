//! The closed operation tag the walker matches on. The graph this crate consumes names operations
//! by string (as handed down by the external graph builder), so the single place that string can
//! fail to resolve is `Op::try_from`; once past that boundary every other piece of code matches an
//! exhaustive enum instead of carrying a fallback string case around.

use std::fmt;

use tengu_backend::{Error, Kind, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Identity,
    Assign,
    AssignAdd,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    SigmoidGrad,
    Sign,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Abs,
    Sqrt,
    Negate,
    Square,
    Reciprocal,
    Tanh,
    TanhGrad,
    Sigmoid,
    ClipByValue,
    MatMul,
    Zeros,
    Ones,
    ZerosLike,
    OnesLike,
    Eye,
    Fill,
    BroadcastTransform,
    BroadcastGradientArgs,
    Shape,
    Reshape,
    RandomUniform,
    RandomNormal,
    GlorotUniform,
    FlowGroup,
    Sum,
    Prod,
    Mean,
    ArgMin,
    ArgMax,
    Index,
    Truncate,
    Pad,
    Concat,
}

impl Op {
    /// The kernel name this op dispatches to, for the ops that go through the kernel dispatcher
    /// (binary/unary elementwise and matmul). Ops resolved entirely on the host or through
    /// structural buffer manipulation have no kernel counterpart and are not named here.
    pub fn kernel_name(self) -> Option<&'static str> {
        match self {
            Op::Add => Some("add"),
            Op::Sub => Some("sub"),
            Op::Mul => Some("mul"),
            Op::Div => Some("div"),
            Op::Pow => Some("pow"),
            Op::SigmoidGrad => Some("sigmoid_grad"),
            Op::Sign => Some("sign"),
            Op::Exp => Some("exp"),
            Op::Log => Some("log"),
            Op::Sin => Some("sin"),
            Op::Cos => Some("cos"),
            Op::Tan => Some("tan"),
            Op::Abs => Some("abs"),
            Op::Sqrt => Some("sqrt"),
            Op::Negate => Some("negate"),
            Op::Square => Some("square"),
            Op::Reciprocal => Some("reciprocal"),
            Op::Tanh => Some("tanh"),
            Op::TanhGrad => Some("tanh_grad"),
            Op::Sigmoid => Some("sigmoid"),
            Op::ClipByValue => Some("clip_by_value"),
            _ => None,
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow | Op::SigmoidGrad)
    }

    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Op::Sign
                | Op::Exp
                | Op::Log
                | Op::Sin
                | Op::Cos
                | Op::Tan
                | Op::Abs
                | Op::Sqrt
                | Op::Negate
                | Op::Square
                | Op::Reciprocal
                | Op::Tanh
                | Op::TanhGrad
                | Op::Sigmoid
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Identity => "identity",
            Op::Assign => "assign",
            Op::AssignAdd => "assign_add",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Pow => "pow",
            Op::SigmoidGrad => "sigmoid_grad",
            Op::Sign => "sign",
            Op::Exp => "exp",
            Op::Log => "log",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Tan => "tan",
            Op::Abs => "abs",
            Op::Sqrt => "sqrt",
            Op::Negate => "negate",
            Op::Square => "square",
            Op::Reciprocal => "reciprocal",
            Op::Tanh => "tanh",
            Op::TanhGrad => "tanh_grad",
            Op::Sigmoid => "sigmoid",
            Op::ClipByValue => "clip_by_value",
            Op::MatMul => "matmul",
            Op::Zeros => "zeros",
            Op::Ones => "ones",
            Op::ZerosLike => "zeros_like",
            Op::OnesLike => "ones_like",
            Op::Eye => "eye",
            Op::Fill => "fill",
            Op::BroadcastTransform => "broadcast_transform",
            Op::BroadcastGradientArgs => "broadcast_gradient_args",
            Op::Shape => "shape",
            Op::Reshape => "reshape",
            Op::RandomUniform => "random_uniform",
            Op::RandomNormal => "random_normal",
            Op::GlorotUniform => "glorot_uniform",
            Op::FlowGroup => "flow_group",
            Op::Sum => "sum",
            Op::Prod => "prod",
            Op::Mean => "mean",
            Op::ArgMin => "argmin",
            Op::ArgMax => "argmax",
            Op::Index => "index",
            Op::Truncate => "truncate",
            Op::Pad => "pad",
            Op::Concat => "concat",
        }
    }
}

impl TryFrom<&str> for Op {
    type Error = tengu_backend::Error;

    fn try_from(name: &str) -> Result<Self> {
        Ok(match name {
            "identity" => Op::Identity,
            "assign" => Op::Assign,
            "assign_add" => Op::AssignAdd,
            "add" => Op::Add,
            "sub" => Op::Sub,
            "mul" => Op::Mul,
            "div" => Op::Div,
            "pow" => Op::Pow,
            "sigmoid_grad" => Op::SigmoidGrad,
            "sign" => Op::Sign,
            "exp" => Op::Exp,
            "log" => Op::Log,
            "sin" => Op::Sin,
            "cos" => Op::Cos,
            "tan" => Op::Tan,
            "abs" => Op::Abs,
            "sqrt" => Op::Sqrt,
            "negate" => Op::Negate,
            "square" => Op::Square,
            "reciprocal" => Op::Reciprocal,
            "tanh" => Op::Tanh,
            "tanh_grad" => Op::TanhGrad,
            "sigmoid" => Op::Sigmoid,
            "clip_by_value" => Op::ClipByValue,
            "matmul" => Op::MatMul,
            "zeros" => Op::Zeros,
            "ones" => Op::Ones,
            "zeros_like" => Op::ZerosLike,
            "ones_like" => Op::OnesLike,
            "eye" => Op::Eye,
            "fill" => Op::Fill,
            "broadcast_transform" => Op::BroadcastTransform,
            "broadcast_gradient_args" => Op::BroadcastGradientArgs,
            "shape" => Op::Shape,
            "reshape" => Op::Reshape,
            "random_uniform" => Op::RandomUniform,
            "random_normal" => Op::RandomNormal,
            "glorot_uniform" => Op::GlorotUniform,
            "flow_group" => Op::FlowGroup,
            "sum" => Op::Sum,
            "prod" => Op::Prod,
            "mean" => Op::Mean,
            "argmin" => Op::ArgMin,
            "argmax" => Op::ArgMax,
            "index" => Op::Index,
            "truncate" => Op::Truncate,
            "pad" => Op::Pad,
            "concat" => Op::Concat,
            other => return Err(Error::execution(Kind::UnknownOp(other.to_string()), other, None)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_name() {
        for op in [Op::Add, Op::MatMul, Op::GlorotUniform, Op::BroadcastGradientArgs, Op::Concat] {
            let parsed = Op::try_from(op.as_str()).unwrap();
            assert_eq!(parsed, op);
        }
    }

    #[test]
    fn unknown_name_reports_unknown_op() {
        let err = Op::try_from("frobnicate").unwrap_err();
        match err {
            Error::Execution { kind: Kind::UnknownOp(name), .. } => assert_eq!(name, "frobnicate"),
            other => panic!("expected UnknownOp, got {other:?}"),
        }
    }
}
