use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, ExprLit, ItemFn, Lit, Meta, MetaNameValue};

/// Register an async function as the executor for an execution kind.
///
/// The function must be `async`, take the task definition by value and
/// return `Result<(), E>` where `E` converts into a boxed error. It is added
/// to the runtime's link-time executor list and picked up by
/// `TaskSchedulerBuilder::register_all()` or `ExecutorRegistry::with_registered()`.
///
/// # Examples
///
/// ```rust,ignore
/// use cadence::{executor, BoxError, ScheduledTask};
///
/// // Handles exec_type "cleanup" with task_type "old_data"
/// #[executor(exec_type = "cleanup", task_type = "old_data")]
/// async fn clean_old_data(task: ScheduledTask) -> Result<(), BoxError> {
///     println!("cleaning with params {}", task.task_params);
///     Ok(())
/// }
///
/// // Handles every task_type of exec_type "report"
/// #[executor(exec_type = "report")]
/// async fn any_report(task: ScheduledTask) -> Result<(), BoxError> {
///     Ok(())
/// }
/// ```
///
/// # Parameters
///
/// - `exec_type`: execution kind to handle (required)
/// - `task_type`: task type within the kind; omit to handle all of them
#[proc_macro_attribute]
pub fn executor(args: TokenStream, input: TokenStream) -> TokenStream {
    let attr_args =
        syn::parse_macro_input!(args with Punctuated::<Meta, syn::Token![,]>::parse_terminated);
    let input_fn = syn::parse_macro_input!(input as ItemFn);

    match expand_executor(&attr_args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_executor(
    attr_args: &Punctuated<Meta, syn::Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new(
            input_fn.sig.fn_token.span(),
            "#[executor] can only be applied to async functions",
        ));
    }
    if input_fn.sig.inputs.len() != 1 {
        return Err(syn::Error::new(
            input_fn.sig.inputs.span(),
            "#[executor] functions take exactly one argument: the ScheduledTask",
        ));
    }

    let ExecutorArgs {
        exec_type,
        task_type,
    } = parse_executor_args(attr_args, &input_fn)?;

    let fn_name = &input_fn.sig.ident;

    // Generate unique registration function name
    let register_fn_name = format_ident!("__register_executor_{}", fn_name);

    Ok(quote! {
        #input_fn

        // Auto-registration using linkme
        #[::cadence::cadence_runtime::linkme::distributed_slice(::cadence::cadence_runtime::EXECUTORS)]
        #[linkme(crate = ::cadence::cadence_runtime::linkme)]
        fn #register_fn_name() -> ::cadence::cadence_runtime::ExecutorRegistration {
            fn handler(
                task: ::cadence::cadence_runtime::ScheduledTask,
            ) -> ::cadence::cadence_runtime::ExecutorFuture<'static> {
                ::std::boxed::Box::pin(async move {
                    #fn_name(task)
                        .await
                        .map_err(::std::convert::Into::<::cadence::cadence_runtime::BoxError>::into)
                })
            }

            ::cadence::cadence_runtime::ExecutorRegistration {
                name: stringify!(#fn_name),
                exec_type: #exec_type,
                task_type: #task_type,
                handler,
            }
        }
    })
}

struct ExecutorArgs {
    exec_type: String,
    task_type: String,
}

fn parse_executor_args(
    attr_args: &Punctuated<Meta, syn::Token![,]>,
    input_fn: &ItemFn,
) -> syn::Result<ExecutorArgs> {
    let mut exec_type = None;
    let mut task_type = None;

    for arg in attr_args {
        let Meta::NameValue(MetaNameValue { path, value, .. }) = arg else {
            return Err(syn::Error::new(
                arg.span(),
                "expected `exec_type = \"...\"` or `task_type = \"...\"`",
            ));
        };
        let key = path.get_ident().map(|i| i.to_string()).unwrap_or_default();

        let text = match value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => s.value(),
            _ => {
                return Err(syn::Error::new(
                    value.span(),
                    format!("{key} must be a string literal"),
                ))
            }
        };

        match key.as_str() {
            "exec_type" => exec_type = Some(text),
            "task_type" => task_type = Some(text),
            _ => {
                return Err(syn::Error::new(
                    path.span(),
                    format!("unknown executor parameter `{key}`"),
                ))
            }
        }
    }

    let exec_type = exec_type
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            syn::Error::new(
                input_fn.sig.ident.span(),
                "#[executor] requires a non-empty `exec_type = \"...\"`",
            )
        })?;

    Ok(ExecutorArgs {
        exec_type,
        task_type: task_type.unwrap_or_default(),
    })
}
