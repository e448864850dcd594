//! Lexer tests using rstest for parameterization.

use linepipe_kernel::lexer::{split_commands, tokenize};
use rstest::rstest;

// =============================================================================
// Tokenizer
// =============================================================================

#[rstest]
#[case::double_quotes(r#"grep -i "hello world""#, &["grep", "-i", "hello world"])]
#[case::sed_expression("sed s/foo/bar/g", &["sed", "s/foo/bar/g"])]
#[case::quoted_space_delimiter("cut -d' ' -f1", &["cut", "-d ", "-f1"])]
#[case::plain("head 10", &["head", "10"])]
#[case::single_quotes("tr 'abc' 'ABC'", &["tr", "abc", "ABC"])]
#[case::tabs("sort\t-r\t\t-n", &["sort", "-r", "-n"])]
#[case::escaped_space(r"grep a\ b", &["grep", "a b"])]
#[case::escaped_quote_in_quotes(r#"grep "a\"b""#, &["grep", "a\"b"])]
#[case::other_quote_is_literal(r#"grep "it's""#, &["grep", "it's"])]
#[case::adjacent_quotes(r#"grep ab"cd"'ef'"#, &["grep", "abcdef"])]
#[case::empty_quoted("replace x \"\"", &["replace", "x", ""])]
#[case::unterminated_quote("grep 'open ended", &["grep", "open ended"])]
fn lexer_tokenize(#[case] input: &str, #[case] expected: &[&str]) {
    assert_eq!(tokenize(input), expected);
}

#[rstest]
#[case::empty("")]
#[case::spaces("   ")]
#[case::tabs("\t\t")]
fn lexer_tokenize_blank(#[case] input: &str) {
    assert!(tokenize(input).is_empty());
}

// =============================================================================
// Command lists
// =============================================================================

#[rstest]
#[case::brace_args(&["{ls -la}", "{grep .go}", "{wc -l}"], "|", &["ls -la", "grep .go", "wc -l"])]
#[case::brace_single(&["{cat file.txt}, {sort}, {uniq}"], "|", &["cat file.txt", "sort", "uniq"])]
#[case::brace_quotes(&["{cat data.json}", "{jq '.users[]'}"], "|", &["cat data.json", "jq '.users[]'"])]
#[case::single_arg(&["grep pattern | sort | uniq"], "|", &["grep pattern", "sort", "uniq"])]
#[case::separator_arg(&["cut", "-f1", "|", "grep", "pattern"], "|", &["cut -f1", "grep pattern"])]
#[case::custom_separator(&["grep x -> sort -> uniq"], "->", &["grep x", "sort", "uniq"])]
#[case::args_with_spaces(&["grep pattern", "sort -r", "uniq"], "|", &["grep pattern", "sort -r", "uniq"])]
#[case::empty_segments(&["grep pattern | | sort"], "|", &["grep pattern", "sort"])]
#[case::joined_words(&["sort", "-r"], "|", &["sort -r"])]
#[case::quoted_separator(&[r#"grep "a|b" | sort"#], "|", &[r#"grep "a|b""#, "sort"])]
#[case::empty_separator_defaults(&["tac | rev"], "", &["tac", "rev"])]
fn lexer_split_commands(#[case] args: &[&str], #[case] separator: &str, #[case] expected: &[&str]) {
    assert_eq!(split_commands(args, separator), expected);
}

#[test]
fn lexer_split_commands_nothing() {
    let args: [&str; 0] = [];
    assert!(split_commands(&args, "|").is_empty());
}
