//! Code block languages
//!
//! Code blocks carry a numeric language code; fenced blocks want a name.

const LANGUAGES: &[&str] = &[
    "",
    "plaintext",
    "abap",
    "ada",
    "apache",
    "apex",
    "assembly",
    "bash",
    "csharp",
    "cpp",
    "c",
    "cobol",
    "css",
    "coffeescript",
    "d",
    "dart",
    "delphi",
    "django",
    "dockerfile",
    "erlang",
    "fortran",
    "foxpro",
    "go",
    "groovy",
    "html",
    "htmlbars",
    "http",
    "haskell",
    "json",
    "java",
    "javascript",
    "julia",
    "kotlin",
    "latex",
    "lisp",
    "logo",
    "lua",
    "matlab",
    "makefile",
    "markdown",
    "nginx",
    "objectivec",
    "openedgeabl",
    "php",
    "perl",
    "postscript",
    "powershell",
    "prolog",
    "protobuf",
    "python",
    "r",
    "rpg",
    "ruby",
    "rust",
    "sas",
    "scss",
    "sql",
    "scala",
    "scheme",
    "scratch",
    "shell",
    "swift",
    "thrift",
    "typescript",
    "vbscript",
    "vb",
    "xml",
    "yaml",
    "cmake",
    "diff",
    "gherkin",
    "graphql",
    "glsl",
    "properties",
    "solidity",
    "toml",
];

/// Fence label for a language code; unknown codes and plain text yield `""`
pub fn language_name(code: i64) -> &'static str {
    match usize::try_from(code) {
        Ok(1) => "",
        Ok(index) => LANGUAGES.get(index).copied().unwrap_or(""),
        Err(_) => "",
    }
}
