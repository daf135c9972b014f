pub use newt_msg::code::{Code,
                         BAD_GATEWAY,
                         BAD_OPTION,
                         BAD_REQUEST,
                         CHANGED,
                         CONTENT,
                         CREATED,
                         DELETED,
                         FORBIDDEN,
                         GATEWAY_TIMEOUT,
                         INTERNAL_SERVER_ERROR,
                         MEMORY_ALLOCATION_ERROR,
                         METHOD_NOT_ALLOWED,
                         NOT_FOUND,
                         NOT_IMPLEMENTED,
                         PACKET_SERIALIZATION_ERROR,
                         PRECONDITION_FAILED,
                         PROXYING_NOT_SUPPORTED,
                         REQUEST_ENTITY_TOO_LARGE,
                         SERVICE_UNAVAILABLE,
                         UNAUTHORIZED,
                         UNSUPPORTED_MEDIA_TYPE,
                         VALID};
