use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use quote::ToTokens;
use syn::{parse_macro_input, Ident, ImplItemFn};

/// This macro is added before a method of the `Table` struct in the impl block.
/// Use this macro to first check if the current round phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(Deal)]` will make a method first check if the
/// current round phase is `Deal`. If not, the method returns
/// `SimulationError::WrongPhase` without touching the table.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream1, item: TokenStream1) -> TokenStream1 {
    let phase = parse_macro_input!(attr as Ident);
    let ast = parse_macro_input!(item as ImplItemFn);
    expand_allowed_phase(phase, ast).into()
}

fn expand_allowed_phase(phase: Ident, mut ast: ImplItemFn) -> TokenStream2 {
    let method = ast.sig.ident.to_string();
    let early_return: syn::Stmt = syn::parse_quote! {
        if self.phase != RoundPhase::#phase {
            return Err(SimulationError::WrongPhase {
                method: #method,
                expected: RoundPhase::#phase,
                actual: self.phase,
            });
        }
    };
    ast.block.stmts.insert(0, early_return);
    ast.into_token_stream()
}
