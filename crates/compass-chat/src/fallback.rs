//! Templated answers for questions no workflow covers.
//!
//! Anchors are checked in a fixed priority order against the lower-cased
//! input; the first hit picks a topic template, otherwise the generic
//! clarifying-question template is used.

use tracing::debug;

/// Which fallback template a question was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackTopic {
    DesignSystem,
    ResearchMethods,
    General,
}

impl FallbackTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackTopic::DesignSystem => "design_system",
            FallbackTopic::ResearchMethods => "research_methods",
            FallbackTopic::General => "general",
        }
    }

    /// The template body for this topic.
    pub fn template(&self) -> &'static str {
        match self {
            FallbackTopic::DesignSystem => DESIGN_SYSTEM_RESPONSE,
            FallbackTopic::ResearchMethods => RESEARCH_METHODS_RESPONSE,
            FallbackTopic::General => GENERAL_RESPONSE,
        }
    }
}

/// Anchor substrings in priority order.
const ANCHORS: &[(&str, FallbackTopic)] = &[
    ("design system", FallbackTopic::DesignSystem),
    ("user research", FallbackTopic::ResearchMethods),
    ("research methods", FallbackTopic::ResearchMethods),
];

/// Produces a plausible assistant reply when no workflow matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Pick the template topic for `text`.
    pub fn classify(&self, text: &str) -> FallbackTopic {
        let lowered = text.to_lowercase();
        ANCHORS
            .iter()
            .find(|(anchor, _)| lowered.contains(anchor))
            .map(|(_, topic)| *topic)
            .unwrap_or(FallbackTopic::General)
    }

    /// Generate the fallback answer. Never empty.
    pub fn generate(&self, text: &str) -> String {
        let topic = self.classify(text);
        debug!(topic = topic.as_str(), "Generated fallback response");
        topic.template().to_string()
    }
}

// =============================================================================
// Templates
// =============================================================================

const DESIGN_SYSTEM_RESPONSE: &str = r#"# Design System Strategy

Based on your healthcare context and current team structure, here are my recommendations for your design system approach:

## Key Principles for Healthcare Design Systems

1. **Clinical Accuracy**: Components must maintain precision in medical data presentation
2. **Accessibility First**: WCAG AA compliance as a minimum baseline  
3. **Contextual Density**: Ability to adapt information density based on user role and scenario
4. **Compliance Built-in**: Design patterns that inherently support regulatory requirements

## Implementation Recommendations

- Start with a core components audit to identify what's already in use
- Prioritize clinical workflows for initial pattern development
- Create a governance model that includes clinical stakeholders
- Develop a contribution model that works with your agile process

Would you like me to elaborate on any specific aspect of design system implementation for healthcare?"#;

const RESEARCH_METHODS_RESPONSE: &str = r#"# Research Methods for Healthcare UX

Based on your specific context, I recommend this research approach:

## Recommended Methods

### For Clinician Users
- **Contextual Inquiry**: Observing workflow in actual clinical settings
- **Diary Studies**: Understanding usage patterns across shifts  
- **Task Analysis**: Measuring efficiency of key clinical workflows

### For Administrative Users
- **Jobs-to-be-Done Interviews**: Understanding core administrative needs
- **Service Blueprinting**: Mapping cross-departmental workflows
- **Usability Benchmarking**: Comparing against industry standards

### For Patients  
- **Accessibility Evaluation**: Ensuring inclusive design
- **First-Click Testing**: Optimizing critical navigation paths
- **Comprehension Testing**: Ensuring medical information clarity

## Research Planning Framework

I've analyzed your current research activities and recommend:
1. Quarterly deep-dive studies on high-impact areas
2. Monthly pulse checks on key metrics  
3. Bi-weekly usability testing on in-development features

Would you like me to develop a specific research plan for an upcoming feature?"#;

const GENERAL_RESPONSE: &str = r#"Based on your healthcare platform context and the data sources I have access to, I can provide strategic guidance on this question.

To give you the most helpful response, could you share a bit more about:

1. Which specific aspect of this challenge is most pressing for your team right now?
2. Are there any particular constraints (time, resources, technical) I should consider?
3. Have you tried approaches to address this already?

This will help me tailor my strategic recommendations to your specific situation."#;

// =============================================================================
// Tests
// =============================================================================
