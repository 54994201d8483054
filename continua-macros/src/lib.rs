mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Runs an `async fn main` as the root task of a chain.
///
/// ```rust,ignore
/// #[continua::main]
/// async fn main() {
///     println!("{}", answer().await);
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return utils::error("#[continua::main] takes no arguments");
    }

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();
    utils::strip_async(&mut tokens);

    match utils::wrap_body(tokens) {
        Some(tokens) => tokens.into_iter().collect(),
        None => utils::error("#[continua::main] expects a function body"),
    }
}

/// Runs an `async fn` test as the root task of a chain.
///
/// ```rust,ignore
/// #[continua::test]
/// async fn adds() {
///     assert_eq!(add(1, 2).await, 3);
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return utils::error("#[continua::test] takes no arguments");
    }

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();
    utils::strip_async(&mut tokens);

    let Some(tokens) = utils::wrap_body(tokens) else {
        return utils::error("#[continua::test] expects a function body");
    };

    let test_attr: TokenStream = "#[test]".parse().unwrap_or_default();
    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(tokens);

    result.into_iter().collect()
}
