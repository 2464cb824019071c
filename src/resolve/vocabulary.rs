//! Curated vocabulary tables for entity resolution.
//!
//! Two compiled-in tables:
//!
//! - [`KNOWN_VARIATIONS`]: spelling and casing variants of frequently
//!   extracted entity names, each mapped to one canonical spelling.
//! - [`DEFAULT_ABBREVIATIONS`]: upper-case abbreviations and their
//!   expansions. Callers may layer overrides on top at runtime.

/// A known-variation entry: one canonical spelling and its surface variants.
pub struct Variation {
    /// Canonical spelling.
    pub canonical: &'static str,
    /// Lower-case surface variants that map to `canonical`.
    pub variants: &'static [&'static str],
}

/// The static known-variation table.
pub static KNOWN_VARIATIONS: &[Variation] = &[
    // AI products and organizations
    Variation {
        canonical: "ChatGPT",
        variants: &["chatgpt", "chat gpt", "chat-gpt", "chatgpt-3.5"],
    },
    Variation {
        canonical: "GPT-4",
        variants: &["gpt4", "gpt 4", "gpt-4"],
    },
    Variation {
        canonical: "OpenAI",
        variants: &["openai", "open ai", "open-ai"],
    },
    Variation {
        canonical: "Anthropic",
        variants: &["anthropic", "anthropic ai"],
    },
    Variation {
        canonical: "DeepMind",
        variants: &["deepmind", "deep mind", "google deepmind"],
    },
    Variation {
        canonical: "Hugging Face",
        variants: &["huggingface", "hugging face", "hf"],
    },
    // Field names
    Variation {
        canonical: "Artificial Intelligence",
        variants: &["ai", "a.i.", "artificial intelligence"],
    },
    Variation {
        canonical: "Machine Learning",
        variants: &["ml", "machine-learning", "machine learning"],
    },
    Variation {
        canonical: "Deep Learning",
        variants: &["dl", "deep-learning", "deep learning"],
    },
    Variation {
        canonical: "Large Language Model",
        variants: &["llm", "llms", "large language models", "large language model"],
    },
    Variation {
        canonical: "Natural Language Processing",
        variants: &["nlp", "natural language processing"],
    },
    Variation {
        canonical: "Knowledge Graph",
        variants: &["knowledge graphs", "knowledge-graph", "knowledge graph"],
    },
    // Languages and platforms
    Variation {
        canonical: "JavaScript",
        variants: &["javascript", "js", "java script", "ecmascript"],
    },
    Variation {
        canonical: "TypeScript",
        variants: &["typescript", "ts"],
    },
    Variation {
        canonical: "Python",
        variants: &["python", "python3", "py"],
    },
    Variation {
        canonical: "Rust",
        variants: &["rust", "rustlang", "rust-lang"],
    },
    Variation {
        canonical: "Node.js",
        variants: &["nodejs", "node js", "node.js"],
    },
    Variation {
        canonical: "React",
        variants: &["react", "reactjs", "react.js"],
    },
    Variation {
        canonical: "PostgreSQL",
        variants: &["postgres", "postgresql", "psql", "pg"],
    },
    Variation {
        canonical: "Kubernetes",
        variants: &["kubernetes", "k8s", "kube"],
    },
    Variation {
        canonical: "GitHub",
        variants: &["github", "git hub"],
    },
    Variation {
        canonical: "macOS",
        variants: &["macos", "mac os", "osx", "os x"],
    },
];

/// The built-in abbreviation table, keyed by upper-case abbreviation.
pub static DEFAULT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("AGI", "Artificial General Intelligence"),
    ("API", "Application Programming Interface"),
    ("CI", "Continuous Integration"),
    ("CLI", "Command Line Interface"),
    ("CNN", "Convolutional Neural Network"),
    ("CPU", "Central Processing Unit"),
    ("DNS", "Domain Name System"),
    ("GAN", "Generative Adversarial Network"),
    ("GPU", "Graphics Processing Unit"),
    ("HTTP", "Hypertext Transfer Protocol"),
    ("IDE", "Integrated Development Environment"),
    ("JSON", "JavaScript Object Notation"),
    ("KG", "Knowledge Graph"),
    ("NER", "Named Entity Recognition"),
    ("ORM", "Object Relational Mapping"),
    ("OS", "Operating System"),
    ("RAG", "Retrieval Augmented Generation"),
    ("RAM", "Random Access Memory"),
    ("REST", "Representational State Transfer"),
    ("RL", "Reinforcement Learning"),
    ("RNN", "Recurrent Neural Network"),
    ("SDK", "Software Development Kit"),
    ("SQL", "Structured Query Language"),
    ("TCP", "Transmission Control Protocol"),
    ("UI", "User Interface"),
    ("URL", "Uniform Resource Locator"),
    ("UX", "User Experience"),
];

/// Look up a surface form in the known-variation table (case-insensitive).
pub fn lookup_variation(surface: &str) -> Option<&'static str> {
    let lower = surface.to_lowercase();

    for variation in KNOWN_VARIATIONS {
        if variation.canonical.to_lowercase() == lower {
            return Some(variation.canonical);
        }
        if variation.variants.iter().any(|v| *v == lower) {
            return Some(variation.canonical);
        }
    }

    None
}
