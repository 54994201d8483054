use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Removes the first `async` keyword from a function signature.
pub(crate) fn strip_async(tokens: &mut Vec<TokenTree>) {
    if let Some(pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(pos);
    }
}

/// Replaces the function body with one that runs the original body as the
/// root task of a chain and blocks until it completes.
///
/// Returns `None` if no body was found.
pub(crate) fn wrap_body(mut tokens: Vec<TokenTree>) -> Option<Vec<TokenTree>> {
    let pos = tokens.iter().rposition(
        |t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace),
    )?;

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => return None,
    };

    let new_block = format!(
        "{{
            ::continua::sync_await(::continua::Task::new(async move {{
                {}
            }}))
        }}",
        block
    );

    let stream = new_block.parse::<TokenStream>().ok()?;
    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Some(tokens)
}

/// Expands to a `compile_error!` carrying `message`.
pub(crate) fn error(message: &str) -> TokenStream {
    format!("compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}
