use crate::{
    batch::{Toast, ToastKind},
    data::pagination::PageControls,
};
use maud::{Markup, Render, html};
use std::time::Duration;

pub fn render_table(titles: &[&str], rows: Vec<Vec<Markup>>) -> Markup {
    html! {
        div class="overflow-x-auto" {
            table class="min-w-full bg-gray-800 rounded shadow-md" {
                thead class="bg-gray-700" {
                    tr {
                        @for title in titles {
                            th class="py-2 px-4 text-left font-semibold text-gray-300" {(title)}
                        }
                    }
                }
                tbody {
                    @if rows.is_empty() {
                        tr {
                            td colspan=(titles.len()) class="py-4 px-4 text-center italic text-gray-400" {"Nothing found"}
                        }
                    }
                    @for row in rows {
                        tr {
                            @for col in row {
                                td class="py-2 px-4 border-b border-gray-600 text-gray-200" {(col)}
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn title(s: impl Render) -> Markup {
    html! {
        h1 class="text-2xl font-semibold mb-4" {(s)}
    }
}

pub fn subtitle(s: impl Render) -> Markup {
    html! {
        h2 class="text-xl font-semibold mb-2" {(s)}
    }
}

pub fn form_element(id: &str, label: &str, element: Markup) -> Markup {
    html! {
        div class="mb-4" {
            label for=(id) class="block text-sm font-bold mb-2 text-gray-300" {(label)}
            (element)
        }
    }
}

pub fn simple_form_element(
    id: &str,
    label: &str,
    required: bool,
    input_type: Option<&str>,
    default_value: Option<&str>,
) -> Markup {
    form_element(
        id,
        label,
        html! {
            input type=(input_type.unwrap_or("text")) id=(id) name=(id) required[required] value=[default_value] class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600" {}
        },
    )
}

pub fn form_submit_button(text: Option<&str>) -> Markup {
    html! {
        div class="flex items-center justify-between" {
            button type="submit" class="bg-blue-500 hover:bg-blue-700 font-bold py-2 px-4 rounded focus:outline-none focus:shadow-outline" {
                (text.unwrap_or("Submit"))
            }
        }
    }
}

fn dialog(colours: &str, heading: &str, message: impl Render) -> Markup {
    html! {
        div class="alert fixed inset-0 bg-black/60 flex items-center justify-center z-40" {
            div class={"rounded-lg shadow-xl p-6 max-w-md w-full text-center " (colours)} role="alert" {
                h2 class="text-xl font-bold mb-2" {(heading)}
                p class="mb-4" {(message)}
                button type="button" onclick="this.closest('.alert').remove()" class="bg-slate-600 hover:bg-slate-800 text-white font-bold py-2 px-4 rounded" {"OK"}
            }
        }
    }
}

pub fn error_alert(message: impl Render) -> Markup {
    dialog("bg-red-100 border border-red-400 text-red-700", "Oops...", message)
}

pub fn success_alert(heading: &str, message: impl Render) -> Markup {
    dialog("bg-green-100 border border-green-400 text-green-800", heading, message)
}

/// Toasts share one lifecycle animation; the per-toast delay staggers them.
pub fn toasts(toasts: &[Toast]) -> Markup {
    html! {
        div id="toasts" hx-swap-oob="true" class="fixed top-4 right-4 flex flex-col space-y-2 z-50" {
            @for toast in toasts {
                @let colour = match toast.kind {
                    ToastKind::Success => "bg-green-600",
                    ToastKind::Error => "bg-red-600",
                };
                div class={"rounded shadow-md px-4 py-2 " (colour)} style={"animation: toast-lifecycle 2s ease-in-out " (toast.delay.as_millis()) "ms both"} {
                    (toast.text)
                }
            }
        }
    }
}

pub fn search_box(endpoint: &str, target: &str, debounce: Duration, current: &str) -> Markup {
    html! {
        input type="search" name="search" value=(current) placeholder="Search..."
            hx-get=(endpoint)
            hx-trigger={"input changed delay:" (debounce.as_millis()) "ms, search"}
            hx-target=(target)
            hx-swap="innerHTML"
            hx-sync={(target) ":replace"}
            class="shadow appearance-none border rounded w-full py-2 px-3 mb-4 leading-tight focus:outline-none bg-gray-700 border-gray-600" {}
    }
}

pub fn page_controls(endpoint: &str, target: &str, search: &str, controls: PageControls) -> Markup {
    let link = |page: u32| format!("{endpoint}?page={page}&search={}", urlencode(search));

    html! {
        div class="flex flex-row items-center justify-between mt-4" {
            @if let Some(previous) = controls.previous {
                button hx-get=(link(previous)) hx-target=(target) hx-sync={(target) ":replace"} class="bg-slate-600 hover:bg-slate-800 font-bold py-1 px-3 rounded" {"Previous"}
            } @else {
                button disabled class="bg-slate-700 text-gray-500 py-1 px-3 rounded" {"Previous"}
            }
            span class="text-gray-300" {"Page " (controls.page) " of " (controls.total)}
            @if let Some(next) = controls.next {
                button hx-get=(link(next)) hx-target=(target) hx-sync={(target) ":replace"} class="bg-slate-600 hover:bg-slate-800 font-bold py-1 px-3 rounded" {"Next"}
            } @else {
                button disabled class="bg-slate-700 text-gray-500 py-1 px-3 rounded" {"Next"}
            }
        }
    }
}

pub fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_box_is_debounced_and_replaces_in_flight_requests() {
        let markup = search_box("/internal/list/students", "#list", Duration::from_millis(300), "")
            .into_string();

        assert!(markup.contains("delay:300ms"));
        assert!(markup.contains(r##"hx-sync="#list:replace""##));
    }

    #[test]
    fn page_controls_disable_out_of_range_buttons() {
        let markup = page_controls(
            "/internal/list/students",
            "#list",
            "jane doe",
            PageControls::new(1, 3),
        )
        .into_string();

        assert!(markup.contains("page=2&amp;search=jane+doe"));
        assert!(!markup.contains("page=0"));
        assert!(markup.contains("Page 1 of 3"));
    }

    #[test]
    fn toasts_carry_their_delays_in_order() {
        let markup = toasts(&[
            Toast {
                kind: ToastKind::Success,
                text: "first".into(),
                delay: Duration::ZERO,
            },
            Toast {
                kind: ToastKind::Error,
                text: "second".into(),
                delay: Duration::from_millis(2_100),
            },
        ])
        .into_string();

        let first = markup.find("first").unwrap();
        let second = markup.find("second").unwrap();
        assert!(first < second);
        assert!(markup.contains("ease-in-out 0ms both"));
        assert!(markup.contains("ease-in-out 2100ms both"));
    }
}
