// src/sandbox/languages.rs

use serde::Serialize;

/// A runtime the sandbox is expected to provide.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub monaco_id: &'static str,
    pub file_extension: &'static str,
    pub file_name: &'static str,
    pub starter_code: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[LanguageConfig] = &[
    LanguageConfig {
        id: "python",
        name: "Python",
        version: "3.10.0",
        monaco_id: "python",
        file_extension: "py",
        file_name: "main.py",
        starter_code: "# Write your solution here\n\ndef solution():\n    pass\n\nif __name__ == \"__main__\":\n    solution()\n",
    },
    LanguageConfig {
        id: "java",
        name: "Java",
        version: "15.0.2",
        monaco_id: "java",
        file_extension: "java",
        file_name: "Main.java",
        starter_code: "import java.util.*;\n\npublic class Main {\n    public static void main(String[] args) {\n        Scanner scanner = new Scanner(System.in);\n    }\n}\n",
    },
    LanguageConfig {
        id: "cpp",
        name: "C++",
        version: "10.2.0",
        monaco_id: "cpp",
        file_extension: "cpp",
        file_name: "main.cpp",
        starter_code: "#include <iostream>\nusing namespace std;\n\nint main() {\n    return 0;\n}\n",
    },
    LanguageConfig {
        id: "c",
        name: "C",
        version: "10.2.0",
        monaco_id: "c",
        file_extension: "c",
        file_name: "main.c",
        starter_code: "#include <stdio.h>\n\nint main() {\n    return 0;\n}\n",
    },
];

pub fn find(id: &str) -> Option<&'static LanguageConfig> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.id == id)
}

pub fn is_supported(id: &str) -> bool {
    find(id).is_some()
}

pub fn ids() -> impl Iterator<Item = &'static str> {
    SUPPORTED_LANGUAGES.iter().map(|l| l.id)
}

/// Pinned runtime version, `*` (latest) for unknown ids.
pub fn version_of(id: &str) -> &'static str {
    find(id).map_or("*", |l| l.version)
}

/// Source file name the runtime expects (Java needs `Main.java`).
pub fn file_name_of(id: &str) -> &'static str {
    find(id).map_or("main", |l| l.file_name)
}
