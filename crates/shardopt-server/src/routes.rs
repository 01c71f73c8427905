//! # HTTP Route Handlers
//!
//! ## Optimization Flow
//!
//! Both optimize endpoints take a parsed statement and its bound parameters as JSON:
//!
//! 1. **Resolve key** (sharding only): inserts into tables with a generate-key column
//!    get their key values first.
//! 2. **Build**: the factory picks and builds the engine for the statement.
//! 3. **Optimize**: the engine's result is returned together with the engine kind.
//!
//! ## Error Handling
//!
//! - 400 / 422 from the `Json` extractor: the body is not a valid request
//! - 422 Unprocessable Entity: the statement cannot be optimized (see `OptimizeError`)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use shardopt_core::statement::Statement;
use shardopt_core::value::ScalarValue;
use shardopt_core::OptimizeError;
use shardopt_engine::{
    new_encrypt_engine, new_sharding_engine, EngineKind, GeneratedKey, OptimizeResult,
};
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /rules: list configured tables.
pub async fn list_rules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(RulesResponse {
        sharding_tables: owned(state.sharding_rule.table_names()),
        encrypt_tables: owned(state.encrypt_rule.table_names()),
    })
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

#[derive(Serialize)]
pub struct RulesResponse {
    pub sharding_tables: Vec<String>,
    pub encrypt_tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub statement: Statement,
    #[serde(default)]
    pub parameters: Vec<ScalarValue>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub engine: EngineKind,
    pub result: OptimizeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_key: Option<GeneratedKey>,
}

/// POST /optimize/sharding
pub async fn optimize_sharding(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, (StatusCode, String)> {
    let rule = state.sharding_rule.as_ref();
    let generated_key = match &req.statement {
        Statement::Insert(insert) => {
            GeneratedKey::resolve(rule, insert, &req.parameters).map_err(unprocessable)?
        }
        _ => None,
    };
    let engine = new_sharding_engine(rule, &req.statement, &req.parameters, generated_key.as_ref())
        .map_err(unprocessable)?;
    let engine_kind = engine.kind();
    Ok(Json(OptimizeResponse {
        engine: engine_kind,
        result: engine.optimize(),
        generated_key,
    }))
}

/// POST /optimize/encrypt
pub async fn optimize_encrypt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, (StatusCode, String)> {
    let engine = new_encrypt_engine(state.encrypt_rule.as_ref(), &req.statement, &req.parameters)
        .map_err(unprocessable)?;
    let engine_kind = engine.kind();
    Ok(Json(OptimizeResponse {
        engine: engine_kind,
        result: engine.optimize(),
        generated_key: None,
    }))
}

fn unprocessable(err: OptimizeError) -> (StatusCode, String) {
    debug!("Optimization rejected: {}", err);
    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use shardopt_core::statement::{InsertRow, InsertStatement, InsertValue};

    fn state() -> Arc<AppState> {
        let config = RuleConfig::from_yaml(
            r#"
sharding:
  tables:
    - name: t_order
      sharding_columns: [user_id]
      key_column: order_id
      key_generator: { type: increment, start: 10 }
encrypt:
  tables:
    - name: t_order
      columns:
        - name: note
          encryptor: md5
"#,
        )
        .unwrap();
        Arc::new(AppState::from_config(&config).unwrap())
    }

    fn insert(values: Vec<InsertValue>) -> OptimizeRequest {
        OptimizeRequest {
            statement: Statement::Insert(InsertStatement {
                table: "t_order".into(),
                columns: vec!["user_id".into(), "note".into()],
                rows: vec![InsertRow::new(values)],
            }),
            parameters: vec![],
        }
    }

    #[tokio::test]
    async fn test_sharding_insert_returns_generated_key() {
        let Json(resp) = optimize_sharding(
            State(state()),
            Json(insert(vec![
                InsertValue::Literal(ScalarValue::Int64(1)),
                InsertValue::Literal(ScalarValue::utf8("hi")),
            ])),
        )
        .await
        .unwrap();
        assert_eq!(resp.engine, EngineKind::Insert);
        let key = resp.generated_key.unwrap();
        assert_eq!(key.values, vec![ScalarValue::Int64(10)]);
        let OptimizeResult::Insert(result) = resp.result else {
            panic!("expected insert result");
        };
        assert_eq!(result.columns, vec!["user_id", "note", "order_id"]);
    }

    #[tokio::test]
    async fn test_optimize_error_maps_to_422() {
        let (status, message) = optimize_encrypt(
            State(state()),
            Json(insert(vec![InsertValue::Parameter(0), InsertValue::Parameter(1)])),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(message.contains("Parameter index 0"));
    }

    #[test]
    fn test_request_json_shape() {
        let req: OptimizeRequest = serde_json::from_str(
            r#"{"statement":{"Other":{"kind":"Ddl"}},"parameters":[{"Int64":1}]}"#,
        )
        .unwrap();
        assert_eq!(req.parameters, vec![ScalarValue::Int64(1)]);
        assert!(matches!(req.statement, Statement::Other(_)));
    }
}
