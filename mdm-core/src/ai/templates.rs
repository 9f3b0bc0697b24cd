//! Built-in summary prompts

use crate::error::AiError;

/// Placeholder replaced by the document text
pub const CONTENT_PLACEHOLDER: &str = "{content}";

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that analyzes and summarizes markdown documents. ALWAYS format your responses using proper Markdown syntax including headers (# ## ###), bullet points, numbered lists, code blocks (```), emphasis (*italic*, **bold**), and proper line spacing. Ensure your output is a well-structured, properly formatted Markdown document that will render beautifully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
}

impl PromptTemplate {
    pub fn format(&self, content: &str) -> String {
        fill(self.prompt, content)
    }
}

/// Substitute `content` into a prompt. A prompt without a placeholder gets
/// the content appended under its own header.
pub fn fill(prompt: &str, content: &str) -> String {
    if prompt.contains(CONTENT_PLACEHOLDER) {
        prompt.replace(CONTENT_PLACEHOLDER, content)
    } else {
        format!("{}\n\nDocument content:\n{}", prompt.trim_end(), content)
    }
}

pub fn all() -> &'static [PromptTemplate] {
    &TEMPLATES
}

pub fn template(key: &str) -> Result<&'static PromptTemplate, AiError> {
    TEMPLATES
        .iter()
        .find(|t| t.key == key)
        .ok_or_else(|| AiError::InvalidTemplateKey(key.to_string()))
}

static TEMPLATES: [PromptTemplate; 6] = [
    PromptTemplate {
        key: "high_level",
        name: "High Level Summary",
        description: "Brief overview focusing on main topics and key points",
        prompt: r#"Please provide a high-level summary of this markdown document. Focus on:
- Main topics and key themes
- Primary purpose and objectives
- Key takeaways
- Target audience (if apparent)

Keep the summary concise (2-4 paragraphs) and accessible to a general audience.

**Format Requirements:**
- Use proper Markdown headers (# ## ###)
- Use bullet points for lists
- Use **bold** for emphasis on key points
- Use *italic* for subtle emphasis
- Ensure proper paragraph spacing
- Structure as a complete, well-formatted Markdown document

Document content:
{content}"#,
    },
    PromptTemplate {
        key: "detailed",
        name: "Detailed Overview",
        description: "Comprehensive analysis including context, scope, and implications",
        prompt: r#"Please provide a detailed overview of this markdown document. Include:
- Comprehensive summary of all major sections
- Context and background information
- Scope and coverage of the content
- Key concepts and terminology explained
- Implications or significance of the information
- Relationships between different topics covered

Provide a thorough analysis suitable for someone who needs to understand the full scope of the document.

**Format Requirements:**
- Use clear Markdown headers (# ## ###) to organize sections
- Use numbered lists for sequential information
- Use bullet points for related items
- Use `code blocks` for technical terms or code
- Use **bold** for important concepts
- Use *italic* for definitions or emphasis
- Include proper paragraph breaks and spacing
- Structure as a professional, well-formatted Markdown document

Document content:
{content}"#,
    },
    PromptTemplate {
        key: "architectural",
        name: "Architectural Overview",
        description: "Focus on system design, components, and relationships",
        prompt: r#"Please analyze this markdown document from an architectural perspective. Focus on:
- System components and their roles
- Architecture patterns and design principles
- Component relationships and dependencies
- Data flow and communication patterns
- Technical stack and technologies mentioned
- Scalability and performance considerations
- Integration points and interfaces

Present the analysis in a way that would be useful for software architects and technical leads.

**Format Requirements:**
- Use clear Markdown headers (# ## ###) for different architectural aspects
- Use bullet points for component lists and features
- Use numbered lists for processes or sequential steps
- Use ```code blocks``` for technical specifications or code examples
- Use **bold** for component names and important terms
- Use *italic* for architectural patterns or concepts
- Include diagrams descriptions in text format where helpful
- Structure as a technical Markdown document with proper formatting

Document content:
{content}"#,
    },
    PromptTemplate {
        key: "technical",
        name: "Technical Detail",
        description: "Deep dive into implementation details and technical specifications",
        prompt: r#"Please provide a technical deep-dive analysis of this markdown document. Focus on:
- Implementation details and code examples
- Technical specifications and requirements
- APIs, protocols, and data formats
- Configuration and setup instructions
- Technical dependencies and prerequisites
- Performance metrics and optimization details
- Troubleshooting and debugging information
- Best practices and conventions mentioned

Provide technical insights suitable for developers and engineers working with this system.

**Format Requirements:**
- Use clear Markdown headers (# ## ###) for different technical aspects
- Use ```code blocks``` with language specification for all code examples
- Use bullet points for requirements, features, and lists
- Use numbered lists for step-by-step procedures
- Use **bold** for important technical terms and concepts
- Use *italic* for file names, variables, and parameters
- Use tables for specifications and comparisons where appropriate
- Include proper code formatting and syntax highlighting
- Structure as a comprehensive technical Markdown document

Document content:
{content}"#,
    },
    PromptTemplate {
        key: "review",
        name: "Technical Review",
        description: "Critical analysis identifying strengths, weaknesses, and recommendations",
        prompt: r#"Please provide a technical review of this markdown document. Include:
- Strengths and positive aspects
- Areas for improvement or potential issues
- Missing information or gaps in documentation
- Clarity and organization assessment
- Technical accuracy review (if applicable)
- Recommendations for enhancements
- Suggested next steps or follow-up actions
- Risk assessment or potential concerns

Provide constructive feedback that would help improve the document or the system it describes.

**Format Requirements:**
- Use clear Markdown headers (# ## ###) to organize review sections
- Use bullet points for strengths, weaknesses, and recommendations
- Use numbered lists for prioritized action items or steps
- Use **bold** for important findings and key recommendations
- Use *italic* for document references and specific concerns
- Use `code` formatting for specific technical issues
- Include checkboxes (- [ ]) for actionable items
- Structure as a professional review document with clear formatting

Document content:
{content}"#,
    },
    PromptTemplate {
        key: "improve",
        name: "Improve this Document",
        description: "Enhanced version with improved readability, organization, and added context",
        prompt: r#"Please analyze this markdown document and provide an improved version that enhances readability and organization. Your improvements should:

**Structure & Organization:**
- Reorganize content for better logical flow
- Add or improve section headers and subheaders
- Create clear hierarchies and groupings
- Add table of contents if beneficial

**Readability Enhancements:**
- Improve clarity of explanations
- Break up dense paragraphs into digestible chunks
- Add bullet points and numbered lists where appropriate
- Enhance formatting for better visual appeal

**Content Enrichment:**
- Add contextual information where helpful
- Include brief explanations for technical terms
- Add introductory paragraphs to sections when needed
- Suggest examples or use cases where relevant
- Add cross-references between related sections

**Quality Improvements:**
- Fix any formatting inconsistencies
- Ensure consistent terminology throughout
- Improve transitions between sections
- Add summary points where beneficial

**Important Guidelines:**
- DO NOT remove any existing content
- DO NOT change the core meaning or intent
- DO NOT add information that isn't supported by the original content
- Focus on making the existing information clearer and more accessible
- Preserve all original technical details and specifications

**Markdown Formatting Requirements:**
- Use proper Markdown headers (# ## ### ####) for clear hierarchy
- Use bullet points and numbered lists appropriately
- Use **bold** for important terms and concepts
- Use *italic* for emphasis and definitions
- Use `code` blocks for technical terms, file names, and code
- Use tables for structured information
- Include proper line spacing and paragraph breaks
- Add table of contents using Markdown links if beneficial
- Ensure all formatting follows Markdown best practices

Please provide the complete improved document as a well-formatted Markdown file with clear explanations of major changes made.

Original document content:
{content}"#,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_templates_in_order() {
        let keys: Vec<&str> = all().iter().map(|t| t.key).collect();
        assert_eq!(
            keys,
            vec!["high_level", "detailed", "architectural", "technical", "review", "improve"]
        );
    }

    #[test]
    fn every_prompt_ends_with_the_placeholder() {
        for t in all() {
            assert!(t.prompt.ends_with(":\n{content}"), "{}", t.key);
            assert_eq!(t.prompt.matches(CONTENT_PLACEHOLDER).count(), 1, "{}", t.key);
        }
    }

    #[test]
    fn lookup() {
        assert_eq!(template("review").map(|t| t.name).ok(), Some("Technical Review"));
        let err = template("haiku").unwrap_err();
        assert_eq!(err.to_string(), "Invalid template key: haiku");
    }

    #[test]
    fn format_substitutes_content() {
        let prompt = template("high_level").map(|t| t.format("BODY")).unwrap();
        assert!(prompt.ends_with("Document content:\nBODY"));
        assert!(!prompt.contains(CONTENT_PLACEHOLDER));

        let improve = template("improve").map(|t| t.format("BODY")).unwrap();
        assert!(improve.ends_with("Original document content:\nBODY"));
    }

    #[test]
    fn content_with_braces_is_inserted_verbatim() {
        let prompt = fill("Summarise:\n{content}", "fn x() { {content} }");
        assert_eq!(prompt, "Summarise:\nfn x() { {content} }");
    }

    #[test]
    fn prompt_without_placeholder_gets_content_appended() {
        assert_eq!(fill("List risks.\n", "doc"), "List risks.\n\nDocument content:\ndoc");
    }
}
