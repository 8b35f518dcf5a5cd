//! Tests for the Firebird PLAN tokenizer

use super::*;

fn kinds(text: &str) -> Vec<TokenKind> {
    Tokenizer::new(text).map(|t| t.kind).collect()
}

mod keywords {
    use super::*;

    #[test]
    fn test_keywords_are_recognized() {
        assert_eq!(
            kinds("PLAN JOIN HASH SORT MERGE NATURAL ORDER INDEX"),
            vec![
                TokenKind::Plan,
                TokenKind::Join,
                TokenKind::Hash,
                TokenKind::SortMerge,
                TokenKind::Natural,
                TokenKind::Order,
                TokenKind::Index,
            ]
        );
    }

    #[test]
    fn test_sort_merge_is_one_token_across_whitespace() {
        let (token, next) = next_token("SORT \n  MERGE (", 0);
        assert_eq!(token.kind, TokenKind::SortMerge);
        assert_eq!(token.text, "SORT \n  MERGE");
        assert_eq!(next, 13);
    }

    #[test]
    fn test_sort_alone_is_sort() {
        assert_eq!(kinds("SORT (X"), vec![TokenKind::Sort, TokenKind::LeftParen, TokenKind::Identifier]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let (token, _) = next_token("PLANS", 0);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.text, "PLANS");

        let (token, _) = next_token("INDEXES", 0);
        assert_eq!(token.kind, TokenKind::Identifier);
    }

    #[test]
    fn test_keyword_followed_by_dollar_is_identifier() {
        let (token, next) = next_token("PLAN$ITEMS NATURAL", 0);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.text, "PLAN$ITEMS");
        assert_eq!(next, 10);

        let (token, _) = next_token("SORT$X", 0);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.text, "SORT$X");
    }

    #[test]
    fn test_sort_merge_needs_a_complete_second_word() {
        assert_eq!(
            kinds("SORT MERGE$X"),
            vec![TokenKind::Sort, TokenKind::Identifier]
        );
        assert_eq!(kinds("SORT MERGED"), vec![TokenKind::Sort, TokenKind::Identifier]);
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(kinds("plan natural"), vec![TokenKind::Identifier, TokenKind::Identifier]);
    }
}

mod identifiers {
    use super::*;

    #[test]
    fn test_system_identifiers_with_dollar() {
        let (token, next) = next_token("RDB$RELATIONS NATURAL", 0);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.text, "RDB$RELATIONS");
        assert_eq!(next, 13);
    }

    #[test]
    fn test_dotted_identifier() {
        let (token, _) = next_token("SCHEMA.T1 NATURAL", 0);
        assert_eq!(token.text, "SCHEMA.T1");
    }

    #[test]
    fn test_quoted_identifier_with_escaped_quote() {
        let (token, _) = next_token(r#""My ""Table""" NATURAL"#, 0);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.text, r#""My ""Table""""#);
    }
}

mod positions {
    use super::*;

    #[test]
    fn test_offsets_and_text() {
        let tokens: Vec<_> = Tokenizer::new("PLAN (T1 NATURAL)").collect();
        let summary: Vec<_> = tokens.iter().map(|t| (t.kind, t.text, t.offset)).collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Plan, "PLAN", 0),
                (TokenKind::LeftParen, "(", 5),
                (TokenKind::Identifier, "T1", 6),
                (TokenKind::Natural, "NATURAL", 9),
                (TokenKind::RightParen, ")", 16),
            ]
        );
        assert_eq!(tokens[3].end(), 16);
    }

    #[test]
    fn test_whitespace_token_is_returned_by_next_token() {
        let (token, next) = next_token("PLAN   (", 4);
        assert_eq!(token.kind, TokenKind::Whitespace);
        assert_eq!(next, 7);
    }

    #[test]
    fn test_skip_to_significant_token() {
        let (token, next) = skip_to_significant_token("PLAN   (", 4);
        assert_eq!(token.kind, TokenKind::LeftParen);
        assert_eq!(token.offset, 7);
        assert_eq!(next, 8);
    }

    #[test]
    fn test_end_of_input() {
        let (token, next) = next_token("PLAN", 4);
        assert_eq!(token.kind, TokenKind::End);
        assert_eq!(token.text, "");
        assert_eq!(token.offset, 4);
        assert_eq!(next, 4);

        let (token, _) = skip_to_significant_token("PLAN   ", 4);
        assert_eq!(token.kind, TokenKind::End);
        assert_eq!(token.offset, 7);
    }

    #[test]
    fn test_position_past_end_is_end() {
        let (token, next) = next_token("PLAN", 99);
        assert_eq!(token.kind, TokenKind::End);
        assert_eq!(next, 4);
    }

    #[test]
    fn test_deterministic_for_same_position() {
        let text = "PLAN JOIN (A NATURAL, B INDEX (IX))";
        assert_eq!(next_token(text, 5), next_token(text, 5));
    }
}

mod unrecognized {
    use super::*;

    #[test]
    fn test_unrecognized_consumes_one_character() {
        let (token, next) = next_token("#(", 0);
        assert_eq!(token.kind, TokenKind::Unrecognized);
        assert_eq!(token.text, "#");
        assert_eq!(next, 1);
    }

    #[test]
    fn test_unrecognized_multibyte_character() {
        let (token, next) = next_token("€x", 0);
        assert_eq!(token.kind, TokenKind::Unrecognized);
        assert_eq!(token.text, "€");
        assert_eq!(next, "€".len());
    }

    #[test]
    fn test_always_terminates_on_garbage() {
        let tokens = kinds("#%&*!");
        assert_eq!(tokens, vec![TokenKind::Unrecognized; 5]);
    }
}
