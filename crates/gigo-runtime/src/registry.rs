//! Graph operators the gigo backend can offload.

use std::fmt;
use std::str::FromStr;

use crate::error::RuntimeError;

/// An offloadable operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `nn.conv2d`
    Conv2d,
    /// `qnn.conv2d`; runs the float path.
    QuantConv2d,
}

impl OpKind {
    pub const ALL: [OpKind; 2] = [OpKind::Conv2d, OpKind::QuantConv2d];

    /// Graph operator name.
    pub fn op_name(self) -> &'static str {
        match self {
            Self::Conv2d => "nn.conv2d",
            Self::QuantConv2d => "qnn.conv2d",
        }
    }

    /// Kernel entry symbol emitted at call sites.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Conv2d => "gigo_conv2d",
            Self::QuantConv2d => "gigo_quant_conv2d",
        }
    }

    /// Resolve a kernel entry symbol back to its operator.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op_name())
    }
}

impl FromStr for OpKind {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.op_name() == s)
            .ok_or_else(|| RuntimeError::UnsupportedOp(s.to_string()))
    }
}

/// Whether a graph node named `op_name` can be offloaded.
pub fn is_supported(op_name: &str) -> bool {
    op_name.parse::<OpKind>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_ops() {
        assert_eq!("nn.conv2d".parse::<OpKind>().unwrap(), OpKind::Conv2d);
        assert_eq!("qnn.conv2d".parse::<OpKind>().unwrap(), OpKind::QuantConv2d);
    }

    #[test]
    fn rejects_other_ops() {
        for name in ["nn.dense", "nn.conv3d", "NN.CONV2D", ""] {
            assert!(!is_supported(name));
            assert!(matches!(name.parse::<OpKind>(), Err(RuntimeError::UnsupportedOp(n)) if n == name));
        }
    }

    #[test]
    fn symbols_resolve_back() {
        for op in OpKind::ALL {
            assert_eq!(OpKind::from_symbol(op.symbol()), Some(op));
            assert_eq!(op.to_string().parse::<OpKind>().unwrap(), op);
        }
        assert_eq!(OpKind::Conv2d.symbol(), "gigo_conv2d");
        assert_eq!(OpKind::QuantConv2d.symbol(), "gigo_quant_conv2d");
        assert_eq!(OpKind::from_symbol("gigo_dense"), None);
    }
}
