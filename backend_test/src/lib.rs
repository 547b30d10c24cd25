use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies. Each test gets its own empty in-memory store, so nothing
/// needs cleaning up afterwards.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::store::Records`, the store behind that client.
///
/// With `#[backend_test(voter)]`, the client signs up (and so logs in) as
/// `Credentials::example()` before the test runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Log in the client as a voter if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        None => quote! {},
        Some(arg) if arg == "voter" => quote! {
            let response = rocket_client
                .post(uri!(crate::api::accounts::signup))
                .header(rocket::http::ContentType::Form)
                .body(crate::model::api::credentials::Credentials::example().to_form())
                .dispatch()
                .await;
            assert_eq!(response.status(), rocket::http::Status::SeeOther, "voter sign-up failed");
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `voter`")
                .into_compile_error()
                .into();
        }
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            // This test enters backend code, so enable logging.
            log4rs_test_utils::test_logging::init_logging_once_for(["polls_backend"], None, None);

            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::store::Records) {
                let records = crate::store::Records::memory();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_store(records.clone()),
                )
                .await
                .unwrap();

                {
                    #maybe_login
                }

                (rocket_client, records)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, records) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_records = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Accept both bare and qualified paths; the last segment names the type.
                    if let Some(segment) = type_path.path.segments.last() {
                        if segment.ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if segment.ident == "Records" {
                            if has_records {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `Records`",
                                ));
                            }
                            has_records = true;
                            args.push(quote! { records });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `store_ident: Records`",
        ));
    }

    Ok(args)
}
