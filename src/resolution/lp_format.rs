//! A [`MipBackend`] recording the model and rendering it in CPLEX LP format,
//! for inspection or for feeding an external solver.

use std::{
    fmt::{self, Write as _},
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::error::{LotSizingError, Result};

use super::backend::{LinearConstraint, LinearExpr, MipBackend};

const TERMS_PER_LINE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LpVar(usize);

impl LpVar {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct LpFormatWriter {
    names: Vec<String>,
    binary: Vec<bool>,
    constraints: Vec<LinearConstraint<LpVar>>,
    objective: Option<LinearExpr<LpVar>>,
}

impl LpFormatWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nb_variables(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, var: LpVar) -> &str {
        &self.names[var.0]
    }

    pub fn is_binary(&self, var: LpVar) -> bool {
        self.binary[var.0]
    }

    pub fn constraints(&self) -> &[LinearConstraint<LpVar>] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&LinearExpr<LpVar>> {
        self.objective.as_ref()
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        let io_error = |source| LotSizingError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = BufWriter::new(File::create(path).map_err(io_error)?);
        file.write_all(self.to_string().as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)
    }

    fn var(&mut self, name: String, binary: bool) -> LpVar {
        self.names.push(name);
        self.binary.push(binary);
        LpVar(self.names.len() - 1)
    }

    fn write_terms(&self, f: &mut String, terms: &[(LpVar, f64)]) -> fmt::Result {
        let mut written = 0;
        for &(var, coef) in terms.iter().filter(|(_, c)| *c != 0.0) {
            if written > 0 && written % TERMS_PER_LINE == 0 {
                f.push_str("\n   ");
            }
            let sign = if coef < 0.0 { "-" } else { "+" };
            let magnitude = coef.abs();
            match (written, magnitude == 1.0) {
                (0, true) if coef > 0.0 => write!(f, "{}", self.name(var))?,
                (0, false) if coef > 0.0 => write!(f, "{magnitude} {}", self.name(var))?,
                (0, true) => write!(f, "- {}", self.name(var))?,
                (0, false) => write!(f, "- {magnitude} {}", self.name(var))?,
                (_, true) => write!(f, " {sign} {}", self.name(var))?,
                (_, false) => write!(f, " {sign} {magnitude} {}", self.name(var))?,
            }
            written += 1;
        }
        if written == 0 {
            f.push('0');
        }
        Ok(())
    }
}

impl MipBackend for LpFormatWriter {
    type Var = LpVar;

    fn bool_var(&mut self, name: String) -> LpVar {
        self.var(name, true)
    }

    fn num_var(&mut self, name: String) -> LpVar {
        self.var(name, false)
    }

    fn add_constraint(&mut self, constraint: LinearConstraint<LpVar>) {
        self.constraints.push(constraint);
    }

    fn minimise(&mut self, objective: LinearExpr<LpVar>) {
        self.objective = Some(objective);
    }
}

impl fmt::Display for LpFormatWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();

        out.push_str("\\ lot sizing formulation\nMinimize\n obj: ");
        match &self.objective {
            Some(objective) => {
                self.write_terms(&mut out, objective.terms())?;
                let constant = objective.constant_term();
                if constant != 0.0 {
                    write!(out, " {} {}", if constant < 0.0 { "-" } else { "+" }, constant.abs())?;
                }
            }
            None => out.push('0'),
        }

        out.push_str("\nSubject To\n");
        for constraint in &self.constraints {
            let (terms, rhs) = constraint.normalized();
            write!(out, " {}: ", constraint.name)?;
            self.write_terms(&mut out, &terms)?;
            writeln!(out, " {} {rhs}", constraint.sense.symbol())?;
        }

        // continuous variables keep the default [0, +inf) bounds
        let binaries = self
            .names
            .iter()
            .zip(&self.binary)
            .filter(|(_, &b)| b)
            .map(|(n, _)| n.as_str())
            .collect::<Vec<_>>();
        if !binaries.is_empty() {
            out.push_str("Binaries\n");
            for chunk in binaries.chunks(TERMS_PER_LINE) {
                writeln!(out, " {}", chunk.join(" "))?;
            }
        }
        out.push_str("End\n");

        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::ProblemInstance;
    use crate::resolution::model::MipModel;

    #[test]
    fn test_render_small_model() {
        let instance: ProblemInstance = "2\n1\n0 1\n4\n0\n".parse().unwrap();
        let mut writer = LpFormatWriter::new();
        MipModel::build(&instance, &mut writer).unwrap();
        let lp = writer.to_string();

        assert!(lp.starts_with("\\ lot sizing formulation\nMinimize\n obj: 4 s_0_0 + 4 s_0_1\n"));
        assert!(lp.contains(" init_stock_0: s_0_init = 0\n"));
        assert!(lp.contains(" demand_0_1: s_0_0 + x_0_1 - s_0_1 = 1\n"));
        assert!(lp.contains(" state_0_0: x_0_0 - y_0_0 <= 0\n"));
        assert!(lp.contains(" config_1: y_0_1 = 1\n"));
        assert!(lp.contains(" transition_0_0_1: u_0_0_1 - y_0_0 - y_0_1 >= -1\n"));
        assert!(lp.contains("Binaries\n x_0_0 x_0_1 y_0_0 y_0_1 u_0_0_1\n"));
        assert!(lp.ends_with("End\n"));
    }

    #[test]
    fn test_write_file() {
        let instance: ProblemInstance = "1\n1\n1\n2\n0\n".parse().unwrap();
        let mut writer = LpFormatWriter::new();
        MipModel::build(&instance, &mut writer).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.lp");
        writer.write_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), writer.to_string());
    }
}
