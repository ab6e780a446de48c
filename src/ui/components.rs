/// Reusable pieces of the product detail modal

use yew::prelude::*;

use crate::detail::DetailView;

#[derive(Properties, PartialEq)]
pub struct SpinnerProps {
    #[prop_or_default]
    pub message: Option<String>,
}

#[function_component(Spinner)]
pub fn spinner(props: &SpinnerProps) -> Html {
    html! {
        <div class="loading-container" style="padding: 20px; text-align: center;">
            <div class="loading-spinner" style="margin: 0 auto 10px; width: 24px; height: 24px; border: 3px solid #e0e0e0; border-top-color: #FF9900; border-radius: 50%;"></div>
            if let Some(msg) = &props.message {
                <p class="loading-message">{msg}</p>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct AlertProps {
    pub message: String,
}

#[function_component(Alert)]
pub fn alert(props: &AlertProps) -> Html {
    html! {
        <div class="error" style="padding: 12px; border-radius: 4px; background-color: #ffebee; border-left: 4px solid #f44336; margin: 10px 0;">
            <p class="message-paragraph">{&props.message}</p>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct FieldProps {
    pub label: AttrValue,
    pub value: String,
}

#[function_component(Field)]
pub fn field(props: &FieldProps) -> Html {
    html! {
        <p style="margin: 4px 0;">
            <strong>{format!("{}: ", props.label)}</strong>
            {&props.value}
        </p>
    }
}

#[derive(Properties, PartialEq)]
pub struct DetailPanelProps {
    pub view: DetailView,
    #[prop_or_default]
    pub raw: Option<String>,
}

/// Normalized product details, plus the raw response in debug mode
#[function_component(DetailPanel)]
pub fn detail_panel(props: &DetailPanelProps) -> Html {
    let view = &props.view;

    html! {
        <div class="product-details">
            <h2 style="margin-top: 0; padding-right: 30px;">{&view.title}</h2>
            <div style="display: flex; gap: 20px; flex-wrap: wrap;">
                if let Some(image) = &view.image {
                    <div style="flex: 0 0 200px;">
                        <img src={image.src.clone()} alt={image.alt.clone()} style="max-width: 200px; max-height: 200px;" />
                    </div>
                }
                <div style="flex: 1 1 300px;">
                    <Field label="ASIN" value={view.asin.clone()} />
                    <Field label="Brand" value={view.brand.clone()} />
                    if let Some(stage) = &view.stage {
                        <Field label="Stage" value={stage.clone()} />
                    }
                    if let Some(removed) = &view.removed_on {
                        <Field label="Removed" value={removed.clone()} />
                    }
                    if let Some(reported) = &view.reported_on {
                        <Field label="Reported" value={reported.clone()} />
                    }
                </div>
            </div>
            <h3>{"Description"}</h3>
            <p style="white-space: pre-wrap;">{&view.description}</p>
            <h3>{"Reasons"}</h3>
            if view.reasons.is_empty() {
                <p>{"None specified"}</p>
            } else {
                <ul>
                    { for view.reasons.iter().map(|reason| html! { <li>{reason}</li> }) }
                </ul>
            }
            if let Some(raw) = &props.raw {
                <div style="margin-top: 20px; padding-top: 10px; border-top: 1px solid #ddd;">
                    <h3>{"Debug Info"}</h3>
                    <p>{"Raw response from the tracking service:"}</p>
                    <pre style="background-color: #f5f5f5; padding: 10px; border-radius: 4px; overflow: auto; max-height: 300px; font-size: 12px;">{raw}</pre>
                </div>
            }
        </div>
    }
}
