//! Tape compilation of terms with forward evaluation and reverse-mode gradients.
//!
//! A [`CompiledTerm`] flattens the term DAG into a topologically ordered tape.
//! Shared subterms occupy a single tape slot, so they are evaluated once per call.
//! Inputs are split into *variables*, which are differentiated, and *parameters*,
//! which only receive values. This lets one compiled term be re-evaluated under
//! changing parameters (for example Lagrange multipliers) without recompiling.

use std::collections::HashMap;

use ndarray::Array1;

use super::functions::{BinaryFunc, NaryFunc, UnaryFunc};
use super::{Term, TermNode, Variable, VariableId};
use crate::error::{ensure_len, AlOptError, Result};

#[derive(Debug, Clone)]
enum TapeOp {
    /// Index into the concatenated `[variables..., parameters...]` input list
    Input(usize),
    Constant(f64),
    Sum(Vec<usize>),
    Product(usize, usize),
    TermPower(usize, usize),
    ConstPower(usize, i32),
    Unary(UnaryFunc, usize),
    Binary(BinaryFunc, usize, usize),
    Nary(NaryFunc, Vec<usize>),
    Exp(usize),
    Log(usize),
}

/// A term bound to an ordered list of variables and parametric variables.
#[derive(Debug, Clone)]
pub struct CompiledTerm {
    tape: Vec<TapeOp>,
    root: usize,
    variables: Vec<Variable>,
    parameters: Vec<Variable>,
}

struct TapeBuilder<'a> {
    inputs: &'a HashMap<VariableId, usize>,
    tape: Vec<TapeOp>,
    nodes: HashMap<usize, usize>,
    input_slots: HashMap<usize, usize>,
}

impl TapeBuilder<'_> {
    fn push(&mut self, term: &Term) -> Result<usize> {
        if let Some(&index) = self.nodes.get(&term.node_key()) {
            return Ok(index);
        }

        let op = match term.node() {
            TermNode::Zero => TapeOp::Constant(0.0),
            TermNode::Constant(value) => TapeOp::Constant(*value),
            TermNode::Variable(var) => {
                let input = *self
                    .inputs
                    .get(&var.id())
                    .ok_or_else(|| AlOptError::UnboundVariable(var.to_string()))?;
                // distinct nodes of the same variable share one tape slot
                if let Some(&index) = self.input_slots.get(&input) {
                    self.nodes.insert(term.node_key(), index);
                    return Ok(index);
                }
                TapeOp::Input(input)
            }
            TermNode::Sum(terms) => TapeOp::Sum(self.push_all(terms)?),
            TermNode::Product(left, right) => TapeOp::Product(self.push(left)?, self.push(right)?),
            TermNode::TermPower(base, exponent) => {
                TapeOp::TermPower(self.push(base)?, self.push(exponent)?)
            }
            TermNode::ConstPower(base, exponent) => TapeOp::ConstPower(self.push(base)?, *exponent),
            TermNode::UnaryFunc(func, arg) => TapeOp::Unary(func.clone(), self.push(arg)?),
            TermNode::BinaryFunc(func, left, right) => {
                TapeOp::Binary(func.clone(), self.push(left)?, self.push(right)?)
            }
            TermNode::NaryFunc(func, args) => TapeOp::Nary(func.clone(), self.push_all(args)?),
            TermNode::Exp(arg) => TapeOp::Exp(self.push(arg)?),
            TermNode::Log(arg) => TapeOp::Log(self.push(arg)?),
        };

        let index = self.tape.len();
        if let TapeOp::Input(input) = op {
            self.input_slots.insert(input, index);
        }
        self.tape.push(op);
        self.nodes.insert(term.node_key(), index);
        Ok(index)
    }

    fn push_all(&mut self, terms: &[Term]) -> Result<Vec<usize>> {
        terms.iter().map(|term| self.push(term)).collect()
    }
}

impl CompiledTerm {
    pub(crate) fn new(term: &Term, variables: &[Variable], parameters: &[Variable]) -> Result<Self> {
        let mut inputs = HashMap::with_capacity(variables.len() + parameters.len());
        for (index, var) in variables.iter().chain(parameters.iter()).enumerate() {
            if inputs.insert(var.id(), index).is_some() {
                return Err(AlOptError::DuplicateVariable(var.to_string()));
            }
        }

        let mut builder = TapeBuilder {
            inputs: &inputs,
            tape: Vec::new(),
            nodes: HashMap::new(),
            input_slots: HashMap::new(),
        };
        let root = builder.push(term)?;

        Ok(Self {
            tape: builder.tape,
            root,
            variables: variables.to_vec(),
            parameters: parameters.to_vec(),
        })
    }

    /// Number of differentiated variables.
    pub fn dimension(&self) -> usize {
        self.variables.len()
    }

    /// Number of parametric variables.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// The variables, in binding order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The parametric variables, in binding order.
    pub fn parameters(&self) -> &[Variable] {
        &self.parameters
    }

    /// Number of distinct operations on the tape.
    pub fn tape_len(&self) -> usize {
        self.tape.len()
    }

    /// Evaluate the term at `arg`.
    pub fn evaluate(&self, arg: &Array1<f64>) -> Result<f64> {
        self.evaluate_parametric(arg, &[])
    }

    /// Evaluate the term and its gradient at `arg`, returned as `(gradient, value)`.
    pub fn differentiate(&self, arg: &Array1<f64>) -> Result<(Array1<f64>, f64)> {
        self.differentiate_parametric(arg, &[])
    }

    /// Evaluate the term at `arg` with the given parameter values.
    pub fn evaluate_parametric(&self, arg: &Array1<f64>, parameters: &[f64]) -> Result<f64> {
        let values = self.forward(arg, parameters)?;
        Ok(values[self.root])
    }

    /// Evaluate the term and its gradient with respect to the variables only.
    pub fn differentiate_parametric(
        &self,
        arg: &Array1<f64>,
        parameters: &[f64],
    ) -> Result<(Array1<f64>, f64)> {
        let values = self.forward(arg, parameters)?;
        let gradient = self.backward(&values);
        Ok((gradient, values[self.root]))
    }

    fn forward(&self, arg: &Array1<f64>, parameters: &[f64]) -> Result<Vec<f64>> {
        ensure_len("variable values", self.variables.len(), arg.len())?;
        ensure_len("parameter values", self.parameters.len(), parameters.len())?;

        let n = self.variables.len();
        let mut values: Vec<f64> = Vec::with_capacity(self.tape.len());
        for op in &self.tape {
            let value = match op {
                TapeOp::Input(input) if *input < n => arg[*input],
                TapeOp::Input(input) => parameters[*input - n],
                TapeOp::Constant(value) => *value,
                TapeOp::Sum(args) => args.iter().map(|&i| values[i]).sum(),
                TapeOp::Product(left, right) => values[*left] * values[*right],
                TapeOp::TermPower(base, exponent) => values[*base].powf(values[*exponent]),
                TapeOp::ConstPower(base, exponent) => values[*base].powi(*exponent),
                TapeOp::Unary(func, arg) => func.eval(values[*arg]),
                TapeOp::Binary(func, left, right) => func.eval(values[*left], values[*right]),
                TapeOp::Nary(func, args) => {
                    let args: Vec<f64> = args.iter().map(|&i| values[i]).collect();
                    func.eval(&args)
                }
                TapeOp::Exp(arg) => values[*arg].exp(),
                TapeOp::Log(arg) => values[*arg].ln(),
            };
            values.push(value);
        }
        Ok(values)
    }

    fn backward(&self, values: &[f64]) -> Array1<f64> {
        let n = self.variables.len();
        let mut gradient = Array1::zeros(n);
        let mut adjoints = vec![0.0; self.tape.len()];
        adjoints[self.root] = 1.0;

        for i in (0..=self.root).rev() {
            let adjoint = adjoints[i];
            if adjoint == 0.0 {
                continue;
            }
            match &self.tape[i] {
                TapeOp::Input(input) => {
                    if *input < n {
                        gradient[*input] += adjoint;
                    }
                }
                TapeOp::Constant(_) => {}
                TapeOp::Sum(args) => {
                    for &j in args {
                        adjoints[j] += adjoint;
                    }
                }
                TapeOp::Product(left, right) => {
                    adjoints[*left] += adjoint * values[*right];
                    adjoints[*right] += adjoint * values[*left];
                }
                TapeOp::TermPower(base, exponent) => {
                    let (b, e) = (values[*base], values[*exponent]);
                    adjoints[*base] += adjoint * e * b.powf(e - 1.0);
                    // d/de b^e = b^e ln b, which vanishes with b^e
                    if values[i] != 0.0 {
                        adjoints[*exponent] += adjoint * values[i] * b.ln();
                    }
                }
                TapeOp::ConstPower(base, exponent) => {
                    if *exponent != 0 {
                        let b = values[*base];
                        let lowered = match exponent.checked_sub(1) {
                            Some(k) => b.powi(k),
                            None => b.powf(f64::from(*exponent) - 1.0),
                        };
                        adjoints[*base] += adjoint * f64::from(*exponent) * lowered;
                    }
                }
                TapeOp::Unary(func, arg) => {
                    adjoints[*arg] += adjoint * func.diff(values[*arg]);
                }
                TapeOp::Binary(func, left, right) => {
                    let (d_left, d_right) = func.diff(values[*left], values[*right]);
                    adjoints[*left] += adjoint * d_left;
                    adjoints[*right] += adjoint * d_right;
                }
                TapeOp::Nary(func, args) => {
                    let arg_values: Vec<f64> = args.iter().map(|&j| values[j]).collect();
                    for (&j, d) in args.iter().zip(func.diff(&arg_values)) {
                        adjoints[j] += adjoint * d;
                    }
                }
                TapeOp::Exp(arg) => adjoints[*arg] += adjoint * values[i],
                TapeOp::Log(arg) => adjoints[*arg] += adjoint / values[*arg],
            }
        }

        gradient
    }
}
