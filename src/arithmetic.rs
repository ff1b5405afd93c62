use crate::values::Value::{self, *};
use std::ops;

// Operands are type-checked by the bridge before these run.

impl ops::Add for Value {
    type Output = Value;

    fn add(self, other: Value) -> Value {
        match (self, other) {
            (Num(a), Num(b)) => Num(a + b),
            (Str(a), Str(b)) => Str(a + &b),
            _ => unreachable!(),
        }
    }
}

impl ops::Sub for Value {
    type Output = Value;

    fn sub(self, other: Value) -> Value {
        match (self, other) {
            (Num(a), Num(b)) => Num(a - b),
            _ => unreachable!(),
        }
    }
}

impl ops::Mul for Value {
    type Output = Value;

    fn mul(self, other: Value) -> Value {
        match (self, other) {
            (Num(a), Num(b)) => Num(a * b),
            _ => unreachable!(),
        }
    }
}

impl ops::Div for Value {
    type Output = Value;

    fn div(self, other: Value) -> Value {
        match (self, other) {
            (Num(a), Num(b)) => Num(a / b),
            _ => unreachable!(),
        }
    }
}
