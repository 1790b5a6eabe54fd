mod console;

use yew::prelude::*;
use yew_infinite_scroll::PostFeed;

#[function_component]
fn App() -> Html {
    html! {
        <PostFeed />
    }
}

fn main() {
    console_error_panic_hook::set_once();
    console::init();
    yew::Renderer::<App>::new().render();
}
