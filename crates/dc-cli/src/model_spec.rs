//! Model description files (JSON).
//!
//! ```json
//! {
//!   "name": "mode choice",
//!   "kind": "nested",
//!   "parameters": { "LAMBDA_BUS": 0.5 },
//!   "utilities": { "car": "ASC_CAR + B_TIME * 20", "red_bus": "B_TIME * 35" },
//!   "structure": [
//!     { "option": "car" },
//!     { "nest": "bus", "lambda": "LAMBDA_BUS", "children": [{ "option": "red_bus" }] }
//!   ]
//! }
//! ```
//!
//! Utilities are expressions over the parameter set. Lambda and alpha are a
//! number or an expression. Inline `parameters` are defaults; a parameter
//! file passed on the command line overrides them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use dc_logit::{Coefficient, NestBuilder, NestStructure};
use dc_models::{
    CompiledExpr, DiscreteChoiceModel, FixedChoiceModel, ParameterSet, UtilityEnumeration,
    cross_nested_logit, multinomial_logit, nested_logit,
};
use serde::Deserialize;

/// Alternative identified by its name in the model file.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Alternative(pub String);

impl fmt::Debug for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type CliModel =
    FixedChoiceModel<DiscreteChoiceModel<Alternative, (), ParameterSet>, Alternative>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Multinomial,
    Nested,
    CrossNested,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoefficientSpec {
    Value(f64),
    Expression(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Nest {
        nest: String,
        lambda: CoefficientSpec,
        children: Vec<NodeSpec>,
    },
    Option {
        option: String,
        #[serde(default)]
        alpha: Option<CoefficientSpec>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    pub utilities: BTreeMap<String, String>,
    #[serde(default)]
    pub structure: Vec<NodeSpec>,
}

enum Resolved {
    Nest { name: String, lambda: Coefficient<ParameterSet>, children: Vec<Resolved> },
    Option { alternative: Alternative, alpha: Option<Coefficient<ParameterSet>> },
}

impl ModelSpec {
    pub fn read(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading model file {}", path.display()))?;
        let spec: ModelSpec = serde_json::from_str(&json)
            .with_context(|| format!("parsing model file {}", path.display()))?;
        Ok(spec)
    }

    /// Inline defaults overlaid with `overrides`.
    pub fn parameter_set(&self, overrides: Option<&ParameterSet>) -> ParameterSet {
        let mut params: ParameterSet =
            self.parameters.iter().map(|(k, v)| (k.clone(), *v)).collect();
        if let Some(overrides) = overrides {
            for (name, value) in overrides.iter() {
                params.insert(name, value);
            }
        }
        params
    }

    pub fn alternatives(&self) -> impl Iterator<Item = Alternative> + '_ {
        self.utilities.keys().map(|k| Alternative(k.clone()))
    }

    /// The nest structure; for multinomial models, every alternative directly under the root.
    pub fn structure(
        &self,
        params: &ParameterSet,
    ) -> Result<NestStructure<Alternative, ParameterSet>> {
        let resolved = match self.kind {
            ModelKind::Multinomial => {
                if !self.structure.is_empty() {
                    bail!("model '{}': a multinomial model takes no structure", self.name);
                }
                self.alternatives()
                    .map(|alternative| Resolved::Option { alternative, alpha: None })
                    .collect()
            }
            ModelKind::Nested | ModelKind::CrossNested => {
                if self.structure.is_empty() {
                    bail!("model '{}': a {:?} model needs a structure", self.name, self.kind);
                }
                resolve_nodes(&self.structure, params)?
            }
        };
        let structure = match self.kind {
            ModelKind::CrossNested => NestStructure::cross_nested(|root| declare(root, &resolved)),
            _ => NestStructure::nested(|root| declare(root, &resolved)),
        };
        Ok(structure.with_context(|| format!("model '{}'", self.name))?)
    }

    pub fn build(&self, params: ParameterSet) -> Result<CliModel> {
        let mut utilities: UtilityEnumeration<Alternative, (), ParameterSet> =
            UtilityEnumeration::new();
        for (alternative, source) in &self.utilities {
            let expr = compile(source, &params)
                .with_context(|| format!("utility of '{alternative}' in model '{}'", self.name))?;
            utilities.insert(
                Alternative(alternative.clone()),
                Arc::new(move |_: &Alternative, _: &(), p: &ParameterSet| {
                    p.evaluate(&expr).unwrap_or(f64::NAN)
                }),
            )?;
        }

        let model = match self.kind {
            ModelKind::Multinomial => {
                self.structure(&params)?;
                multinomial_logit(self.name.clone(), utilities, params)
            }
            ModelKind::Nested => {
                let structure = self.structure(&params)?;
                nested_logit(self.name.clone(), utilities, structure, params)?
            }
            ModelKind::CrossNested => {
                let structure = self.structure(&params)?;
                cross_nested_logit(self.name.clone(), utilities, structure, params)?
            }
        };
        tracing::info!(
            model = %self.name,
            kind = ?self.kind,
            alternatives = model.choices().len(),
            "model built"
        );
        Ok(model)
    }
}

/// Compile `source` and check it evaluates against `params`.
fn compile(source: &str, params: &ParameterSet) -> Result<CompiledExpr> {
    let expr = CompiledExpr::compile(source)?;
    params.evaluate(&expr)?;
    Ok(expr)
}

fn coefficient(spec: &CoefficientSpec, params: &ParameterSet) -> Result<Coefficient<ParameterSet>> {
    Ok(match spec {
        CoefficientSpec::Value(v) => Coefficient::Fixed(*v),
        CoefficientSpec::Expression(source) => {
            let expr = compile(source, params)?;
            if expr.is_constant() {
                Coefficient::Fixed(expr.eval_row(&[]))
            } else {
                Coefficient::derived(move |p: &ParameterSet| p.evaluate(&expr).unwrap_or(f64::NAN))
            }
        }
    })
}

fn resolve_nodes(nodes: &[NodeSpec], params: &ParameterSet) -> Result<Vec<Resolved>> {
    nodes
        .iter()
        .map(|node| -> Result<Resolved> {
            Ok(match node {
                NodeSpec::Nest { nest, lambda, children } => Resolved::Nest {
                    name: nest.clone(),
                    lambda: coefficient(lambda, params)
                        .with_context(|| format!("lambda of nest '{nest}'"))?,
                    children: resolve_nodes(children, params)?,
                },
                NodeSpec::Option { option, alpha } => Resolved::Option {
                    alternative: Alternative(option.clone()),
                    alpha: alpha
                        .as_ref()
                        .map(|a| coefficient(a, params))
                        .transpose()
                        .with_context(|| format!("alpha of '{option}'"))?,
                },
            })
        })
        .collect()
}

fn declare(builder: &mut NestBuilder<'_, Alternative, ParameterSet>, nodes: &[Resolved]) {
    for node in nodes {
        match node {
            Resolved::Option { alternative, alpha: None } => {
                builder.option(alternative.clone());
            }
            Resolved::Option { alternative, alpha: Some(alpha) } => {
                builder.option_with_alpha(alternative.clone(), alpha.clone());
            }
            Resolved::Nest { name, lambda, children } => {
                builder.nest(name.clone(), lambda.clone(), |nest| declare(nest, children));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{
        "name": "red bus",
        "kind": "nested",
        "parameters": { "LAMBDA": 0.5, "ASC": 0 },
        "utilities": { "car": "ASC", "red": "0", "blue": "0" },
        "structure": [
            { "option": "car" },
            {
                "nest": "bus",
                "lambda": "LAMBDA",
                "children": [{ "option": "red" }, { "option": "blue" }]
            }
        ]
    }"#;

    #[test]
    fn parses_and_builds_nested_model() {
        let spec: ModelSpec = serde_json::from_str(NESTED).unwrap();
        assert_eq!(spec.kind, ModelKind::Nested);
        let params = spec.parameter_set(None);
        let tree = spec.structure(&params).unwrap().render_tree();
        assert!(tree.contains("bus [lambda=f(params)]"), "{tree}");

        let model = spec.build(params).unwrap();
        let p = model.model().probabilities(model.choices(), &()).unwrap();
        let bus = 2f64.sqrt();
        assert!((p[&Alternative("car".into())] - 1.0 / (1.0 + bus)).abs() < 1e-12);
    }

    #[test]
    fn overrides_replace_inline_parameters() {
        let spec: ModelSpec = serde_json::from_str(NESTED).unwrap();
        let file = ParameterSet::parse("LAMBDA = 1\n").unwrap();
        let params = spec.parameter_set(Some(&file));
        assert_eq!(params.get("LAMBDA"), Some(1.0));
        assert_eq!(params.get("ASC"), Some(0.0));
    }

    #[test]
    fn unknown_parameter_is_reported_at_build_time() {
        let spec: ModelSpec = serde_json::from_str(
            r#"{ "name": "m", "kind": "multinomial", "utilities": { "a": "B_MISSING * 2" } }"#,
        )
        .unwrap();
        let err = spec.build(ParameterSet::new()).err().unwrap();
        let msg = format!("{err:#}");
        assert!(msg.contains("utility of 'a'") && msg.contains("B_MISSING"), "{msg}");
    }

    #[test]
    fn rejects_unknown_fields_and_structure_on_multinomial() {
        let extra = r#"{ "name": "m", "kind": "multinomial", "utilities": {}, "extra": 1 }"#;
        assert!(serde_json::from_str::<ModelSpec>(extra).is_err());
        let spec: ModelSpec = serde_json::from_str(
            r#"{
                "name": "m",
                "kind": "multinomial",
                "utilities": { "a": "0" },
                "structure": [{ "option": "a" }]
            }"#,
        )
        .unwrap();
        assert!(spec.build(ParameterSet::new()).is_err());
    }
}
