use proc_macro::TokenStream;

mod record;

#[proc_macro_derive(Record, attributes(record))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    record::record_derive_impl(input)
}
