//! Routing policy - which specialist owns a query

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two specialists a query can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Support,
    Wellness,
}

impl Route {
    /// Name under which the router sees this specialist as a tool
    pub fn tool_name(&self) -> &'static str {
        match self {
            Route::Support => "support_tool",
            Route::Wellness => "wellness_tool",
        }
    }

    /// Human-readable specialist name used in answer annotations
    pub fn label(&self) -> &'static str {
        match self {
            Route::Support => "Support Specialist",
            Route::Wellness => "Wellness Specialist",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "support_tool" => Some(Route::Support),
            "wellness_tool" => Some(Route::Wellness),
            _ => None,
        }
    }

    pub fn all() -> [Route; 2] {
        [Route::Support, Route::Wellness]
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Support => write!(f, "support"),
            Route::Wellness => write!(f, "wellness"),
        }
    }
}

/// Exact product, test, billing and scheduling phrases; any one forces Support
pub const SPECIFICITY_TERMS: &[&str] = &[
    "genetic test",
    "genetic tests",
    "blood report",
    "blood reports",
    "70+ parameters",
    "3-month plan",
    "3 month plan",
    "reschedule",
    "counselling session",
    "counseling session",
    "nugenomics",
    "refund",
    "billing",
    "subscription",
    "test result",
    "test results",
    "my order",
    "my booking",
    "my appointment",
    "my payment",
    "my kit",
];

/// Account words that are everyday English on their own
pub const ACCOUNT_TERMS: &[&str] = &[
    "pricing",
    "price",
    "prices",
    "cost",
    "costs",
    "payment",
    "report",
    "reports",
    "booking",
    "appointment",
    "cancel",
    "order",
    "policy",
];

/// Product nouns that turn an account word into a service question
pub const PRODUCT_ANCHORS: &[&str] = &[
    "plan",
    "plans",
    "test",
    "tests",
    "session",
    "sessions",
    "kit",
    "kits",
    "program",
    "programme",
    "package",
    "membership",
    "consultation",
];

/// General health, fitness and genetics vocabulary
pub const WELLNESS_TERMS: &[&str] = &[
    "diet",
    "nutrition",
    "fitness",
    "exercise",
    "workout",
    "weight",
    "bmi",
    "sleep",
    "stress",
    "muscle",
    "protein",
    "calories",
    "vitamin",
    "supplement",
    "gene",
    "genes",
    "genetic",
    "genetics",
    "dna",
    "health",
    "wellness",
    "lifestyle",
    "yoga",
    "meal",
    "hydration",
];

/// Why a route was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub route: Route,
    /// The term that decided it, or None when the default applied
    pub matched: Option<&'static str>,
}

/// Deterministic keyword classifier; specificity terms beat general terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    default_route: Route,
}

impl RoutingPolicy {
    pub fn new(default_route: Route) -> Self {
        Self { default_route }
    }

    pub fn default_route(&self) -> Route {
        self.default_route
    }

    pub fn classify(&self, query: &str) -> Classification {
        if let Some(term) = service_term(query) {
            return Classification {
                route: Route::Support,
                matched: Some(term),
            };
        }
        if let Some(term) = first_match(query, WELLNESS_TERMS) {
            return Classification {
                route: Route::Wellness,
                matched: Some(term),
            };
        }
        Classification {
            route: self.default_route,
            matched: None,
        }
    }

    /// Apply the specificity rule to a route picked elsewhere
    ///
    /// Only exact specificity phrases override a pick. Anchored account words
    /// are left to the model; the Wellness guardrail catches those.
    pub fn enforce(&self, query: &str, chosen: Route) -> Route {
        if first_match(query, SPECIFICITY_TERMS).is_some() {
            Route::Support
        } else {
            chosen
        }
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::new(Route::Wellness)
    }
}

/// Whether the query names a product, test, billing or scheduling concern
pub fn is_service_query(query: &str) -> bool {
    service_term(query).is_some()
}

/// A specificity phrase, or an account word next to a product noun
fn service_term(query: &str) -> Option<&'static str> {
    first_match(query, SPECIFICITY_TERMS).or_else(|| {
        first_match(query, PRODUCT_ANCHORS)?;
        first_match(query, ACCOUNT_TERMS)
    })
}

fn first_match(query: &str, terms: &[&'static str]) -> Option<&'static str> {
    let haystack = query.to_lowercase();
    terms.iter().copied().find(|term| contains_term(&haystack, term))
}

/// Case-folded match of `term` on word boundaries
fn contains_term(haystack: &str, term: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric();
    let mut from = 0;

    while let Some(pos) = haystack[from..].find(term) {
        let start = from + pos;
        let end = start + term.len();
        let before_ok = haystack[..start].chars().next_back().is_none_or(|c| !is_word(c));
        let after_ok = haystack[end..].chars().next().is_none_or(|c| !is_word(c));
        if before_ok && after_ok {
            return true;
        }
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specificity_routes_to_support() {
        let policy = RoutingPolicy::default();
        let c = policy.classify("Reschedule my counselling session");
        assert_eq!(c.route, Route::Support);
        assert_eq!(c.matched, Some("reschedule"));

        assert_eq!(policy.classify("How much does the NuGenomics kit cost?").route, Route::Support);
        assert_eq!(policy.classify("When will my TEST RESULTS arrive?").route, Route::Support);
    }

    #[test]
    fn test_wellness_routes_to_wellness() {
        let policy = RoutingPolicy::new(Route::Support);
        let c = policy.classify("What's a good diet for muscle gain?");
        assert_eq!(c.route, Route::Wellness);
        assert_eq!(c.matched, Some("diet"));
    }

    #[test]
    fn test_specificity_beats_general_terms() {
        let policy = RoutingPolicy::default();
        assert_eq!(
            policy.classify("Does my genetic test report cover diet and sleep?").route,
            Route::Support
        );
    }

    #[test]
    fn test_default_route_applies() {
        assert_eq!(RoutingPolicy::default().classify("hello there").route, Route::Wellness);
        assert_eq!(RoutingPolicy::default().classify("hello there").matched, None);
        assert_eq!(RoutingPolicy::new(Route::Support).classify("hello there").route, Route::Support);
    }

    #[test]
    fn test_word_boundaries() {
        assert!(contains_term("my kit arrived", "kit"));
        assert!(!contains_term("the kitchen is clean", "kit"));
        assert!(!contains_term("wholesome genetics", "gene"));
        assert!(contains_term("is the 70+ parameters panel", "70+ parameters"));
        assert!(contains_term("cost", "cost"));
        assert!(!contains_term("costly", "cost"));
    }

    #[test]
    fn test_everyday_account_words_stay_on_wellness() {
        let policy = RoutingPolicy::default();
        for query in [
            "What should I eat in order to build muscle?",
            "Is a keto diet worth the cost?",
            "How can I cancel out sugar cravings?",
            "Does my fitness tracker report on sleep quality?",
            "Is there a sleep policy for teenagers?",
        ] {
            assert_eq!(policy.classify(query).route, Route::Wellness, "{}", query);
            assert!(!is_service_query(query), "{}", query);
            assert_eq!(policy.enforce(query, Route::Wellness), Route::Wellness, "{}", query);
        }
    }

    #[test]
    fn test_anchored_account_words_are_service_queries() {
        let policy = RoutingPolicy::default();
        let c = policy.classify("How do I cancel my diet plan?");
        assert_eq!(c.route, Route::Support);
        assert_eq!(c.matched, Some("cancel"));
        assert!(is_service_query("What does the premium package cost?"));
        assert_eq!(policy.classify("Where is my order?").route, Route::Support);
    }

    #[test]
    fn test_enforce_overrides_wellness_pick() {
        let policy = RoutingPolicy::default();
        assert_eq!(policy.enforce("What is your refund policy?", Route::Wellness), Route::Support);
        assert_eq!(policy.enforce("Tips for better sleep", Route::Wellness), Route::Wellness);
        assert_eq!(policy.enforce("Tips for better sleep", Route::Support), Route::Support);
        assert_eq!(policy.enforce("How much does the diet plan cost?", Route::Wellness), Route::Wellness);
    }

    #[test]
    fn test_route_names() {
        for route in Route::all() {
            assert_eq!(Route::from_tool_name(route.tool_name()), Some(route));
        }
        assert_eq!(Route::from_tool_name("finalize"), None);
        assert_eq!(serde_json::to_string(&Route::Wellness).unwrap(), "\"wellness\"");
        assert_eq!(Route::Support.to_string(), "support");
    }
}
