//! calculate_bmi tool - body mass index from weight and height

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolContext, ToolError, ToolOutput, required_f64};
use crate::error::Result;

const TOOL_NAME: &str = "calculate_bmi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal (Healthy Weight)",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BmiReading {
    pub bmi: f64,
    pub category: BmiCategory,
}

impl fmt::Display for BmiReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Calculated BMI is {:.2}, which falls into the '{}' category.",
            self.bmi,
            self.category.label()
        )
    }
}

/// BMI = weight / height²; non-positive inputs are rejected rather than divided by
pub fn calculate_bmi(weight_kg: f64, height_m: f64) -> std::result::Result<BmiReading, ToolError> {
    if !height_m.is_finite() || height_m <= 0.0 {
        return Err(ToolError::invalid(TOOL_NAME, "height_m must be greater than zero"));
    }
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(ToolError::invalid(TOOL_NAME, "weight_kg must be greater than zero"));
    }

    let bmi = weight_kg / (height_m * height_m);
    Ok(BmiReading {
        bmi,
        category: BmiCategory::from_bmi(bmi),
    })
}

pub struct BmiTool;

#[async_trait]
impl Tool for BmiTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn description(&self) -> &'static str {
        "Calculate Body Mass Index from weight in kilograms and height in meters. Returns the BMI value and its category."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "weight_kg": {
                    "type": "number",
                    "description": "Body weight in kilograms"
                },
                "height_m": {
                    "type": "number",
                    "description": "Height in meters"
                }
            },
            "required": ["weight_kg", "height_m"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let weight_kg = required_f64(&input, TOOL_NAME, "weight_kg")?;
        let height_m = required_f64(&input, TOOL_NAME, "height_m")?;
        let reading = calculate_bmi(weight_kg, height_m)?;
        Ok(ToolOutput::success(reading.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_weight() {
        let reading = calculate_bmi(70.0, 1.75).unwrap();
        assert_eq!(reading.category, BmiCategory::Normal);
        assert_eq!(reading.category.label(), "Normal (Healthy Weight)");
        assert!((reading.bmi - 22.857).abs() < 0.01);
        assert_eq!(
            reading.to_string(),
            "Calculated BMI is 22.86, which falls into the 'Normal (Healthy Weight)' category."
        );
    }

    #[test]
    fn test_zero_height_is_argument_error() {
        let result = calculate_bmi(50.0, 0.0);
        assert!(matches!(result, Err(ToolError::InvalidArgument { .. })));
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(calculate_bmi(50.0, -1.6).is_err());
        assert!(calculate_bmi(-50.0, 1.6).is_err());
        assert!(calculate_bmi(f64::NAN, 1.6).is_err());
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(BmiCategory::from_bmi(18.49), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(24.95), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(29.95), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(30.0), BmiCategory::Obese);
    }

    #[tokio::test]
    async fn test_tool_accepts_numeric_strings() {
        let ctx = ToolContext::detached("test");
        let result = BmiTool
            .execute(serde_json::json!({"weight_kg": "90", "height_m": 1.8}), &ctx)
            .await
            .unwrap();
        assert!(result.content.contains("27.78"));
        assert!(result.content.contains("Overweight"));
    }

    #[tokio::test]
    async fn test_tool_zero_height_errors() {
        let ctx = ToolContext::detached("test");
        let result = BmiTool
            .execute(serde_json::json!({"weight_kg": 50, "height_m": 0}), &ctx)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tool_unparseable_argument() {
        let ctx = ToolContext::detached("test");
        let result = BmiTool
            .execute(serde_json::json!({"weight_kg": "heavy", "height_m": 1.7}), &ctx)
            .await;
        assert!(result.is_err());
    }
}
