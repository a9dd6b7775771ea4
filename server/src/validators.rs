//! Request validation
//!
//! All validation happens before anything reaches the process launcher or
//! an upstream runtime. Model identifiers become process arguments, so the
//! character policy here is the command-injection defense.

use crate::models::catalog::ChatRequest;
use crate::models::deploy::{
    DeployBackend, DeployParams, DeployRequest, Quantization, RunMode,
};

/// Upper bound on model identifier length
pub const MAX_MODEL_NAME_LEN: usize = 200;

const INVALID_MODEL_NAME: &str = "Model name contains invalid characters. Only alphanumeric, \
     dots, hyphens, underscores, slashes, and colons are allowed.";

/// Validate a model identifier against `^[A-Za-z0-9][A-Za-z0-9._\-/:]*$`.
pub fn validate_model_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Model name is required".to_string());
    }
    if name.len() > MAX_MODEL_NAME_LEN {
        return Err("Model name is too long".to_string());
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_alphanumeric())
        .unwrap_or(false);
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | ':'));

    if !first_ok || !rest_ok {
        return Err(INVALID_MODEL_NAME.to_string());
    }
    Ok(())
}

/// Validate a raw deploy request into launch-ready parameters.
///
/// Collects every violation so the client can show them all at once.
pub fn validate_deploy_request(req: &DeployRequest) -> Result<DeployParams, Vec<String>> {
    let mut errors = Vec::new();

    let backend = match req.mode.as_deref() {
        Some("cpu") => Some(DeployBackend::Cpu),
        Some("gpu") => Some(DeployBackend::Gpu),
        _ => {
            errors.push(r#"Mode must be "cpu" or "gpu""#.to_string());
            None
        }
    };

    let model = req.model.clone().unwrap_or_default();
    if let Err(e) = validate_model_name(&model) {
        errors.push(e);
    }

    let quantization = match req.quantization.as_deref() {
        None => None,
        Some(tag) => match tag.parse::<Quantization>() {
            Ok(q) => Some(q),
            Err(_) => {
                errors.push("Invalid quantization tag".to_string());
                None
            }
        },
    };

    let run_mode = match req.run_mode.as_deref() {
        None => RunMode::Background,
        Some("background") => RunMode::Background,
        Some("foreground") => RunMode::Foreground,
        Some(_) => {
            errors.push(r#"Run mode must be "background" or "foreground""#.to_string());
            RunMode::Background
        }
    };

    let gpu_slot = match req.gpu_slot {
        None => None,
        Some(0) => Some(0u8),
        Some(1) => Some(1u8),
        Some(_) => {
            errors.push("GPU slot must be 0 or 1".to_string());
            None
        }
    };

    if backend == Some(DeployBackend::Gpu) && gpu_slot.is_none() && req.gpu_slot.is_none() {
        errors.push("GPU slot is required for GPU deployments".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(DeployParams {
        // Checked above; errors would have returned already
        backend: backend.unwrap_or(DeployBackend::Cpu),
        model,
        quantization,
        run_mode,
        gpu_slot,
    })
}

/// Validate a chat request before proxying it to the inference runtime.
pub fn validate_chat_request(req: &ChatRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let model = req.model.as_deref().unwrap_or_default();
    if let Err(e) = validate_model_name(model) {
        errors.push(e);
    }

    if req.message.as_deref().unwrap_or_default().is_empty() {
        errors.push("Message cannot be empty".to_string());
    }

    for turn in &req.conversation_history {
        if !matches!(turn.role.as_str(), "user" | "assistant" | "system") {
            errors.push(format!("Invalid conversation role: {}", turn.role));
            break;
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_request(model: &str) -> DeployRequest {
        DeployRequest {
            mode: Some("cpu".to_string()),
            model: Some(model.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_typical_identifiers() {
        for name in [
            "llama3:8b",
            "TinyLlama/TinyLlama-1.1B",
            "mistralai/Mistral-7B-v0.1",
            "qwen2.5:7b-instruct-q4_K_M",
        ] {
            assert!(validate_model_name(name).is_ok(), "rejected {name}");
        }
    }

    #[test]
    fn test_rejects_shell_metacharacters() {
        for name in [
            "model; rm -rf /",
            "model|cat /etc/passwd",
            "model`id`",
            "model$(whoami)",
            "model > /tmp/out",
            "model && true",
            "-leading-dash",
            ".hidden",
        ] {
            assert!(validate_model_name(name).is_err(), "accepted {name}");
        }
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert!(validate_model_name("").is_err());
        assert!(validate_model_name(&"a".repeat(MAX_MODEL_NAME_LEN + 1)).is_err());
        assert!(validate_model_name(&"a".repeat(MAX_MODEL_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_deploy_request_defaults() {
        let params = validate_deploy_request(&cpu_request("llama3:8b")).unwrap();
        assert_eq!(params.backend, DeployBackend::Cpu);
        assert_eq!(params.run_mode, RunMode::Background);
        assert!(params.quantization.is_none());
        assert!(params.gpu_slot.is_none());
    }

    #[test]
    fn test_deploy_request_gpu_requires_slot() {
        let req = DeployRequest {
            mode: Some("gpu".to_string()),
            model: Some("llama3:8b".to_string()),
            ..Default::default()
        };
        let errors = validate_deploy_request(&req).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e == "GPU slot is required for GPU deployments"));

        let req = DeployRequest {
            gpu_slot: Some(1),
            ..req
        };
        let params = validate_deploy_request(&req).unwrap();
        assert_eq!(params.gpu_slot, Some(1));
    }

    #[test]
    fn test_deploy_request_collects_all_errors() {
        let req = DeployRequest {
            mode: Some("tpu".to_string()),
            model: Some("bad;model".to_string()),
            quantization: Some("Q99".to_string()),
            gpu_slot: Some(7),
            ..Default::default()
        };
        let errors = validate_deploy_request(&req).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_deploy_request_quantization_parsed() {
        let req = DeployRequest {
            quantization: Some("Q4_K_M".to_string()),
            ..cpu_request("llama3:8b")
        };
        let params = validate_deploy_request(&req).unwrap();
        assert_eq!(params.quantization, Some(crate::models::deploy::Quantization::Q4KM));
    }

    #[test]
    fn test_chat_request_validation() {
        let req = ChatRequest {
            model: Some("llama3:8b".to_string()),
            message: Some("hello".to_string()),
            ..Default::default()
        };
        assert!(validate_chat_request(&req).is_ok());

        let req = ChatRequest {
            model: Some("bad`model".to_string()),
            message: Some("".to_string()),
            ..Default::default()
        };
        let errors = validate_chat_request(&req).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
