use crate::errors::FlexError;

/// The single discrete setpoint dimension of the flex asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlexAction {
    NoOp,
    Charge,
    Discharge,
}

impl FlexAction {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        match self {
            FlexAction::NoOp => 0,
            FlexAction::Charge => 1,
            FlexAction::Discharge => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlexAction::NoOp => "no_op",
            FlexAction::Charge => "charge",
            FlexAction::Discharge => "discharge",
        }
    }
}

impl TryFrom<usize> for FlexAction {
    type Error = FlexError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FlexAction::NoOp),
            1 => Ok(FlexAction::Charge),
            2 => Ok(FlexAction::Discharge),
            other => Err(FlexError::InvalidAction(other)),
        }
    }
}
